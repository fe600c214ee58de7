//! Deterministic rendering of generation prompts.
//!
//! Everything here is a pure function of its inputs so templates can be
//! checked without a model or network.

use vitis_core::types::{ConversationTurn, DocumentChunk};

/// Sentence the model must reply with, verbatim, when evidence is missing.
pub const REFUSAL_SENTENCE: &str = "Maaf, saya tidak menemukan informasi yang relevan, silakan bertanya pada sumber lain.";

const EMPTY_CONTEXT: &str = "(Tidak ada dokumen yang relevan ditemukan.)";
const EMPTY_HISTORY: &str = "(Belum ada percakapan sebelumnya.)";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptKind<'a> {
    /// The user's literal question.
    Text,
    /// A disease label produced by the image classifier.
    Image { disease: &'a str },
}

/// Question used for image-triggered answers.
pub fn image_question(disease: &str) -> String {
    format!("Penyakit yang terdeteksi adalah {disease}. Berikan informasi dan saran yang relevan.")
}

/// Chunk texts in rank order, separated by a blank line.
pub fn join_context<'a>(chunks: impl IntoIterator<Item = &'a DocumentChunk>) -> String {
    chunks.into_iter().map(|c| c.text.as_str()).collect::<Vec<_>>().join("\n\n")
}

/// `Human: ...` / `Assistant: ...` lines in chronological order.
pub fn format_history(turns: &[ConversationTurn]) -> String {
    turns.iter().map(|t| format!("{}: {}", t.role.label(), t.text)).collect::<Vec<_>>().join("\n")
}

pub fn render_prompt<'a>(
    kind: PromptKind<'_>,
    context: impl IntoIterator<Item = &'a DocumentChunk>,
    question: &str,
    history: &[ConversationTurn],
) -> String {
    let context = join_context(context);
    let has_context = !context.trim().is_empty();
    let context = if has_context { context } else { EMPTY_CONTEXT.to_string() };
    let history = if history.is_empty() { EMPTY_HISTORY.to_string() } else { format_history(history) };
    let no_evidence = if has_context {
        String::new()
    } else {
        format!("\nKonten dokumen kosong. Jawab hanya dengan kalimat berikut, persis seperti tertulis: '{REFUSAL_SENTENCE}'\n")
    };

    match kind {
        PromptKind::Text => format!(
            "Anda adalah asisten AI yang membahas tanaman anggur di Indonesia.
Gunakan data berikut untuk menjawab:

=== KONTEN DOKUMEN ===
{context}

=== PERTANYAAN PENGGUNA ===
{question}

=== RIWAYAT PERCAKAPAN ===
{history}
{no_evidence}
Berikan jawaban:
- Akurat
- Bahasa Indonesia
- Mudah dipahami oleh semua kalangan
- Berbasis gejala dan hal lain yang relevan
- Jangan membuat jawaban yang tidak ada di konteks (jika tidak ada, katakan '{REFUSAL_SENTENCE}')
"
        ),
        PromptKind::Image { disease } => format!(
            "Anda adalah asisten AI yang membahas tanaman anggur dan penyakit daun
berdasarkan hasil klasifikasi gambar.
Penyakit daun yang terdeteksi dari gambar adalah: **{disease}**.

Tugasmu:
1. Sebutkan hasil klasifikasi gambar yaitu {disease} dan jelaskan secara singkat apa itu {disease}.
2. Sebutkan penyebab umum dan gejala yang biasanya muncul.
3. Berikan saran yang jelas tentang langkah penanganan awal, pencegahan, atau kapan perlu berkonsultasi dengan ahli.
4. Gunakan bahasa Indonesia yang ramah, empatik, dan mudah dimengerti.
5. Jika pengguna menanyakan hal yang tidak berkaitan dengan {disease}, jawab dengan sopan dan ingatkan bahwa fokusmu adalah penyakit ini.
6. Jangan membuat jawaban yang tidak ada di konteks (jika tidak ada, katakan '{REFUSAL_SENTENCE}')
7. Jawab ringkas dan fokus membantu pengguna memahami {disease}.

Gunakan data berikut untuk menjawab:

=== KONTEN DOKUMEN ===
{context}

=== PERTANYAAN PENGGUNA ===
{question}

=== RIWAYAT PERCAKAPAN ===
{history}
{no_evidence}
Pertanyaan pengguna: Berdasarkan penyakit yang terdeteksi yaitu {disease}, berikan informasi dan saran yang relevan.
Asisten:
"
        ),
    }
}
