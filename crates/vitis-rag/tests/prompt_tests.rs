use vitis_core::types::{ConversationTurn, DocumentChunk, Role};
use vitis_rag::prompt::{format_history, join_context};
use vitis_rag::{image_question, render_prompt, PromptKind, REFUSAL_SENTENCE};

#[test]
fn empty_context_instructs_verbatim_refusal() {
    let none: [DocumentChunk; 0] = [];
    let prompt = render_prompt(PromptKind::Text, &none, "Apa itu penyakit X?", &[]);
    assert!(prompt.contains("Tidak ada dokumen yang relevan ditemukan"));
    assert!(prompt.contains("Jawab hanya dengan kalimat berikut"));
    assert!(prompt.contains(REFUSAL_SENTENCE));
    assert_eq!(REFUSAL_SENTENCE, "Maaf, saya tidak menemukan informasi yang relevan, silakan bertanya pada sumber lain.");
}

#[test]
fn text_prompt_carries_context_question_and_history() {
    let chunks = [DocumentChunk::new("c1", "Black rot causes brown lesions"), DocumentChunk::new("c2", "Downy mildew bercak kuning")];
    let history = [ConversationTurn::now(Role::User, "Halo"), ConversationTurn::now(Role::Ai, "Halo, ada yang bisa dibantu?")];
    let prompt = render_prompt(PromptKind::Text, &chunks, "Apa gejala black rot?", &history);

    assert!(prompt.contains("Black rot causes brown lesions\n\nDowny mildew bercak kuning"));
    assert!(prompt.contains("Apa gejala black rot?"));
    assert!(prompt.contains("Human: Halo\nAssistant: Halo, ada yang bisa dibantu?"));
    assert!(!prompt.contains("Jawab hanya dengan kalimat berikut"));
    // Context precedes the question.
    assert!(prompt.find("Black rot causes").unwrap() < prompt.find("Apa gejala black rot?").unwrap());
}

#[test]
fn image_prompt_names_the_disease() {
    let chunks = [DocumentChunk::new("c1", "Esca menimbulkan pola garis harimau")];
    let question = image_question("Esca");
    assert_eq!(question, "Penyakit yang terdeteksi adalah Esca. Berikan informasi dan saran yang relevan.");
    let prompt = render_prompt(PromptKind::Image { disease: "Esca" }, &chunks, &question, &[]);
    assert!(prompt.contains("**Esca**"));
    assert!(prompt.contains("Esca menimbulkan pola garis harimau"));
    assert!(prompt.contains(REFUSAL_SENTENCE));
}

#[test]
fn rendering_is_deterministic() {
    let chunks = [DocumentChunk::new("c1", "teks")];
    let a = render_prompt(PromptKind::Text, &chunks, "q", &[]);
    let b = render_prompt(PromptKind::Text, &chunks, "q", &[]);
    assert_eq!(a, b);
}

#[test]
fn helpers_join_in_order() {
    let chunks = [DocumentChunk::new("a", "satu"), DocumentChunk::new("b", "dua")];
    assert_eq!(join_context(&chunks), "satu\n\ndua");
    assert_eq!(format_history(&[]), "");
    assert_eq!(format_history(&[ConversationTurn::now(Role::Ai, "ok")]), "Assistant: ok");
}
