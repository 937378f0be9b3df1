use card_vision::core::{Card, Frame};
use card_vision::session::{Session, SessionConfig};
use card_vision::source::SyntheticSource;
use card_vision::synthetic::{render_empty_screen, render_table, TableScene, DEFAULT_HEIGHT, DEFAULT_WIDTH};
use card_vision::table::{
    ExternalAmounts, LearnOutcome, PlatformProfile, ReadIssue, RegionRole, SlotOutcome, Street,
    TableReader, TableReading,
};
use card_vision::templates::TemplateStore;

fn cards(list: &str) -> Vec<Card> {
    card_vision::core::parse_cards(list).unwrap()
}

fn scene(hero: &str, board: &str) -> TableScene {
    TableScene::parse(hero, board).unwrap()
}

fn frame(profile: &PlatformProfile, scene: &TableScene) -> Frame {
    Frame::now(render_table(profile, scene, DEFAULT_WIDTH, DEFAULT_HEIGHT))
}

/// Label every provisional created by `reading` with the card drawn in its slot.
fn label_new(
    reader: &TableReader,
    store: &mut TemplateStore,
    scene: &TableScene,
    reading: &TableReading,
) -> usize {
    let mut labeled = 0;
    for slot in &reading.slots {
        if let SlotOutcome::Learned(LearnOutcome::Created(id)) = slot.outcome {
            let card = match slot.role {
                RegionRole::HeroCards => scene.hero[slot.index],
                _ => scene.board[slot.index],
            };
            reader.learner().confirm(store, id, card).unwrap();
            labeled += 1;
        }
    }
    labeled
}

/// A store that knows every card of `scene`.
fn taught(reader: &TableReader, profile: &PlatformProfile, scene: &TableScene) -> TemplateStore {
    let mut store = TemplateStore::new();
    let reading = reader.read_frame(&frame(profile, scene), &mut store);
    label_new(reader, &mut store, scene, &reading);
    store
}

#[test]
fn empty_screen_is_an_invalid_snapshot() {
    let reader = TableReader::new(&PlatformProfile::classic()).unwrap();
    let mut store = TemplateStore::new();
    let frame = Frame::now(render_empty_screen(DEFAULT_WIDTH, DEFAULT_HEIGHT));

    let snapshot = reader.read_snapshot(&frame, &mut store, ExternalAmounts::default());
    assert!(!snapshot.is_valid());
    assert_eq!(snapshot.issue(), Some(&ReadIssue::TableNotFound));
    assert!(snapshot.hero().is_empty());
    assert!(store.is_empty());
    assert_eq!(store.provisional_len(), 0);
}

#[test]
fn unknown_cards_are_learned_then_recognized() {
    let profile = PlatformProfile::classic();
    let reader = TableReader::new(&profile).unwrap();
    let mut store = TemplateStore::new();
    let flop = scene("Ah Kd", "Qs Jc Th");

    let first = reader.read_frame(&frame(&profile, &flop), &mut store);
    assert_eq!(first.new_provisionals().len(), 5);
    assert_eq!(store.provisional_len(), 5);
    assert!(!first.snapshot(ExternalAmounts::default()).is_valid());
    let empty = first
        .slots
        .iter()
        .filter(|s| s.outcome == SlotOutcome::Empty)
        .count();
    assert_eq!(empty, 2);

    // The same crops are recognized as known provisionals, not added again.
    let second = reader.read_frame(&frame(&profile, &flop), &mut store);
    assert!(second.new_provisionals().is_empty());
    assert!(second
        .slots
        .iter()
        .all(|s| matches!(s.outcome, SlotOutcome::Empty | SlotOutcome::Learned(LearnOutcome::Duplicate(_)))));
    assert_eq!(store.provisional_len(), 5);

    assert_eq!(label_new(&reader, &mut store, &flop, &first), 5);
    assert_eq!(store.len(), 5);
    assert_eq!(store.provisional_len(), 0);

    let snapshot = reader.read_snapshot(&frame(&profile, &flop), &mut store, ExternalAmounts::default());
    assert!(snapshot.is_valid(), "{:?}", snapshot.issue());
    assert_eq!(snapshot.hero_cards(), cards("Ah Kd"));
    assert_eq!(snapshot.board_cards(), cards("Qs Jc Th"));
    assert_eq!(snapshot.street(), Street::Flop);
    assert!(snapshot
        .hero()
        .iter()
        .chain(snapshot.board())
        .all(|c| c.confidence > 0.99 && !c.ambiguous));
}

#[test]
fn fourth_board_card_moves_flop_to_turn() {
    let profile = PlatformProfile::classic();
    let reader = TableReader::new(&profile).unwrap();
    let flop = scene("Ah Kd", "Qs Jc Th");
    let mut store = taught(&reader, &profile, &flop);

    let flop_state = reader.read_snapshot(&frame(&profile, &flop), &mut store, ExternalAmounts::default());
    assert_eq!(flop_state.street(), Street::Flop);

    // 2c has never been seen: it becomes a provisional, and with one board
    // card unread the street is not known.
    let turn = scene("Ah Kd", "Qs Jc Th 2c");
    let reading = reader.read_frame(&frame(&profile, &turn), &mut store);
    assert_eq!(reading.new_provisionals().len(), 1);
    assert_eq!(reading.unread_board_slots(), 1);
    let snapshot = reading.snapshot(ExternalAmounts::default());
    assert!(snapshot.is_valid());
    assert_eq!(snapshot.board_cards(), cards("Qs Jc Th"));
    assert_eq!(snapshot.street(), Street::Indeterminate);

    assert_eq!(label_new(&reader, &mut store, &turn, &reading), 1);
    let snapshot = reader.read_snapshot(&frame(&profile, &turn), &mut store, ExternalAmounts::default());
    assert_eq!(snapshot.board_cards(), cards("Qs Jc Th 2c"));
    assert_eq!(snapshot.street(), Street::Turn);
}

#[test]
fn duplicate_cards_invalidate_the_frame() {
    let profile = PlatformProfile::classic();
    let reader = TableReader::new(&profile).unwrap();
    let mut store = taught(&reader, &profile, &scene("Ah Kd", "Qs Jc Th"));
    let before: Vec<_> = store.confirmed().cloned().collect();

    // Board slots 0 and 2 have the same size, so both Qs crops match exactly.
    let bad = scene("Ah Kd", "Qs Jc Qs");
    let reading = reader.read_frame(&frame(&profile, &bad), &mut store);
    assert_eq!(
        reading.rejection,
        Some(ReadIssue::DuplicateCard {
            card: "Qs".parse().unwrap()
        })
    );
    assert_eq!(reading.refinements, 0);

    let snapshot = reading.snapshot(ExternalAmounts::default());
    assert!(!snapshot.is_valid());
    assert!(snapshot.hero().is_empty());
    assert!(snapshot.board().is_empty());
    assert!(store.confirmed().eq(before.iter()));
    assert_eq!(store.provisional_len(), 0);
}

#[test]
fn single_hero_card_is_incomplete() {
    let profile = PlatformProfile::classic();
    let reader = TableReader::new(&profile).unwrap();
    let mut store = taught(&reader, &profile, &scene("Ah Kd", "Qs Jc Th"));

    let snapshot = reader.read_snapshot(
        &frame(&profile, &scene("Ah", "Qs Jc Th")),
        &mut store,
        ExternalAmounts::default(),
    );
    assert_eq!(snapshot.issue(), Some(&ReadIssue::IncompleteHeroCards { found: 1 }));
    assert_eq!(snapshot.street(), Street::Flop);
}

#[test]
fn matching_is_deterministic() {
    let profile = PlatformProfile::classic();
    let reader = TableReader::new(&profile).unwrap();
    let flop = scene("Ah Kd", "Qs Jc Th");
    let store = taught(&reader, &profile, &flop);
    let frame = frame(&profile, &flop);

    let a = reader.read_frame(&frame, &mut store.clone());
    let b = reader.read_frame(&frame, &mut store.clone());
    assert_eq!(a.slots, b.slots);
    assert_eq!(a.snapshot(ExternalAmounts::default()), b.snapshot(ExternalAmounts::default()));
}

#[test]
fn learned_templates_survive_a_restart() {
    let dir = tempfile::tempdir().unwrap();
    let profile = PlatformProfile::classic();
    let reader = TableReader::new(&profile).unwrap();
    let flop = scene("Ah Kd", "Qs Jc Th");

    let mut store = taught(&reader, &profile, &flop);
    store.save_to(dir.path()).unwrap();

    let mut reloaded = TemplateStore::open(dir.path()).unwrap();
    assert_eq!(reloaded.len(), 5);
    let snapshot = reader.read_snapshot(&frame(&profile, &flop), &mut reloaded, ExternalAmounts::default());
    assert!(snapshot.is_valid());
    assert_eq!(snapshot.board_cards(), cards("Qs Jc Th"));
}

#[test]
fn session_flushes_every_few_hands_and_at_shutdown() {
    let dir = tempfile::tempdir().unwrap();
    let profile = PlatformProfile::classic();
    let reader = TableReader::new(&profile).unwrap();
    let hands = [
        scene("Ah Kd", "Qs Jc Th"),
        scene("Qs Jc", "Ah Kd Th"),
        scene("Th Ah", "Kd Qs Jc"),
    ];
    let mut store = TemplateStore::new();
    for s in &hands {
        let reading = reader.read_frame(&frame(&profile, s), &mut store);
        label_new(&reader, &mut store, s, &reading);
    }
    store.set_root(dir.path());

    let scenes = vec![
        hands[0].clone(),
        hands[0].clone(),
        hands[1].clone(),
        hands[2].clone(),
    ];
    let source = SyntheticSource::new(profile, scenes, DEFAULT_WIDTH, DEFAULT_HEIGHT);
    let config = SessionConfig {
        flush_every_hands: 2,
        max_cycles: None,
    };
    let mut session = Session::new(reader, store, source, config);
    let mut streets = Vec::new();
    let stats = session.run(|s| streets.push(s.street()));

    assert_eq!(stats.cycles, 4);
    assert_eq!(stats.valid, 4);
    assert_eq!(stats.hands, 3);
    assert_eq!(stats.flushes, 2);
    assert_eq!(stats.flush_failures, 0);
    assert_eq!(streets, vec![Street::Flop; 4]);
    assert!(!session.store().is_dirty());
    assert_eq!(TemplateStore::open(dir.path()).unwrap().len(), session.store().len());
}

#[test]
fn flush_failure_does_not_stop_the_session() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("not-a-dir");
    std::fs::write(&blocker, b"file").unwrap();

    let profile = PlatformProfile::classic();
    let reader = TableReader::new(&profile).unwrap();
    let mut store = TemplateStore::new();
    store.set_root(&blocker);

    let scenes = vec![scene("Ah Kd", "Qs Jc Th"); 2];
    let source = SyntheticSource::new(profile, scenes, DEFAULT_WIDTH, DEFAULT_HEIGHT);
    let mut session = Session::new(reader, store, source, SessionConfig::default());
    let stats = session.run(|_| {});

    assert_eq!(stats.cycles, 2);
    assert_eq!(stats.provisional_created, 5);
    assert_eq!(stats.flush_failures, 1);
    assert_eq!(session.store().provisional_len(), 5);
    assert!(session.store().is_dirty());
}
