use card_vision_core::{Card, GrayImage};
use card_vision_match::{perceptual_hash, CardTemplate, TemplateStore};
use chrono::{TimeZone, Utc};

fn noisy(w: usize, h: usize, seed: u64) -> GrayImage {
    let mut state = seed;
    GrayImage::from_fn(w, h, |_, _| {
        state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        (state >> 56) as u8
    })
}

#[test]
fn save_and_reload_is_exact() {
    let dir = tempfile::tempdir().unwrap();
    let seen = Utc.with_ymd_and_hms(2024, 5, 17, 21, 4, 9).unwrap();

    let mut store = TemplateStore::open(dir.path()).unwrap();
    assert!(store.is_empty());

    let qs: Card = "Qs".parse().unwrap();
    let th: Card = "Th".parse().unwrap();
    let mut t = CardTemplate::new(qs, noisy(41, 58, 1), 0.82, seen);
    for s in [0.9, 0.77, 0.95] {
        t.history.push(s);
        t.observations += 1;
    }
    store.insert_confirmed(t);
    store.insert_confirmed(CardTemplate::new(th, noisy(40, 56, 2), 0.91, seen));

    let img = noisy(38, 52, 3);
    let hash = perceptual_hash(&img).unwrap();
    let pid = store.insert_provisional(img, hash, 0.31, seen);

    assert!(store.is_dirty());
    let summary = store.save().unwrap();
    assert_eq!((summary.confirmed, summary.provisional), (2, 1));
    assert!(!store.is_dirty());

    let reloaded = TemplateStore::open(dir.path()).unwrap();
    assert_eq!(reloaded.len(), 2);
    for card in [qs, th] {
        assert_eq!(reloaded.get(card), store.get(card), "template {card}");
    }
    assert_eq!(reloaded.get_provisional(pid), store.get_provisional(pid));
    assert!(!reloaded.is_dirty());
}

#[test]
fn provisional_ids_continue_after_reload() {
    let dir = tempfile::tempdir().unwrap();
    let now = Utc::now();
    let mut store = TemplateStore::open(dir.path()).unwrap();
    for seed in 0..3 {
        let img = noisy(20, 28, seed);
        let hash = perceptual_hash(&img).unwrap();
        store.insert_provisional(img, hash, 0.2, now);
    }
    store.save().unwrap();

    let mut reloaded = TemplateStore::open(dir.path()).unwrap();
    let img = noisy(20, 28, 9);
    let hash = perceptual_hash(&img).unwrap();
    assert_eq!(reloaded.insert_provisional(img, hash, 0.2, now), 3);
}

#[test]
fn open_missing_directory_gives_empty_store() {
    let dir = tempfile::tempdir().unwrap();
    let store = TemplateStore::open(dir.path().join("nope")).unwrap();
    assert!(store.is_empty());
    assert_eq!(store.provisional_len(), 0);
}
