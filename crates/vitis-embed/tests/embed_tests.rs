use vitis_core::config::EmbedSettings;
use vitis_core::traits::Embedder;
use vitis_embed::{get_default_embedder, FakeEmbedder, FAKE_EMBEDDING_DIM};

fn cosine(a: &[f32], b: &[f32]) -> f32 { a.iter().zip(b).map(|(x, y)| x * y).sum() }

#[test]
fn fake_embedder_shapes_and_determinism() {
    // Force fake embedder to avoid loading a model
    std::env::set_var("APP_USE_FAKE_EMBEDDINGS", "1");

    let embedder = get_default_embedder(&EmbedSettings::default()).expect("embedder");
    let texts = vec!["black rot pada daun".to_string(), "black rot pada daun".to_string()];
    let embs = embedder.embed_batch(&texts).expect("embed_batch");
    let (v1, v2) = (&embs[0], &embs[1]);

    assert_eq!(v1.len(), FAKE_EMBEDDING_DIM);
    assert_eq!(embedder.dim(), FAKE_EMBEDDING_DIM);

    let norm: f32 = v1.iter().map(|x| x * x).sum::<f32>().sqrt();
    assert!((norm - 1.0).abs() <= 1e-3, "vector is L2-normalized (norm={norm})");

    for (a, b) in v1.iter().zip(v2.iter()) { assert!((a - b).abs() <= 1e-6); }
}

#[test]
fn fake_embedder_places_shared_vocabulary_closer() {
    let e = FakeEmbedder::new(256);
    let q = e.embed_query("gejala black rot").unwrap();
    let near = e.embed_query("Black rot causes brown lesions on grape leaves").unwrap();
    let far = e.embed_query("pemupukan setelah pemangkasan").unwrap();
    assert!(cosine(&q, &near) > cosine(&q, &far));
}

#[test]
fn fake_embedder_handles_empty_text() {
    let e = FakeEmbedder::new(8);
    let v = e.embed_query("").unwrap();
    assert_eq!(v.len(), 8);
    assert!(v.iter().all(|x| *x == 0.0));
    assert!(e.embed_batch(&[]).unwrap().is_empty());
}
