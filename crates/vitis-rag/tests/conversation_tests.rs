mod common;

use std::sync::Arc;
use std::thread;

use common::{grape_corpus, service, FailingGenerator, MemoryLoader, RecordingGenerator};
use vitis_core::config::ChatSettings;
use vitis_core::error::Error;
use vitis_core::types::Role;
use vitis_rag::{classification_summary, ChatLog, Conversation, InMemoryChatLog, APOLOGY_MESSAGE};

fn conversation(generator: Arc<dyn vitis_rag::Generator>) -> (Conversation, Arc<InMemoryChatLog>) {
    let log = Arc::new(InMemoryChatLog::new());
    let svc = Arc::new(service(MemoryLoader::new(grape_corpus()), generator));
    (Conversation::new(svc, log.clone(), ChatSettings::default()), log)
}

#[test]
fn text_turn_is_logged_and_history_feeds_next_prompt() {
    let generator = Arc::new(RecordingGenerator::default());
    let (conv, log) = conversation(generator.clone());

    let first = conv.handle_text("s1", "r1", "Apa gejala black rot?").unwrap();
    assert_eq!(first, "Black rot adalah penyakit jamur pada daun anggur.");
    let turns = log.history("s1", "r1").unwrap();
    assert_eq!(turns.len(), 2);
    assert_eq!((turns[0].role, turns[0].text.as_str()), (Role::User, "Apa gejala black rot?"));
    assert_eq!(turns[1].role, Role::Ai);
    assert!(generator.last_prompt().contains("=== RIWAYAT PERCAKAPAN ===\nHuman: Apa gejala black rot?\n"));

    conv.handle_text("s1", "r1", "Bagaimana cara mencegahnya?").unwrap();
    let prompt = generator.last_prompt();
    assert!(prompt.contains(
        "Human: Apa gejala black rot?\nAssistant: Black rot adalah penyakit jamur pada daun anggur.\nHuman: Bagaimana cara mencegahnya?"
    ));
    assert_eq!(log.history("s1", "r1").unwrap().len(), 4);
}

#[test]
fn rooms_keep_separate_histories() {
    let (conv, log) = conversation(Arc::new(RecordingGenerator::default()));
    conv.handle_text("s1", "r1", "satu").unwrap();
    conv.handle_text("s1", "r2", "dua").unwrap();
    conv.handle_text("s2", "r1", "tiga").unwrap();
    assert_eq!(log.history("s1", "r1").unwrap()[0].text, "satu");
    assert_eq!(log.history("s1", "r2").unwrap()[0].text, "dua");
    assert_eq!(log.history("s2", "r1").unwrap()[0].text, "tiga");
    assert!(log.history("s3", "r1").unwrap().is_empty());
    assert_eq!(conv.open_rooms(), 0);
}

#[test]
fn empty_inputs_are_malformed() {
    let (conv, log) = conversation(Arc::new(RecordingGenerator::default()));
    for (s, r, m) in [("", "r", "q"), ("s", " ", "q"), ("s", "r", "   ")] {
        let err = conv.handle_text(s, r, m).unwrap_err();
        assert!(matches!(err.downcast_ref::<Error>(), Some(Error::MalformedInput(_))));
    }
    let err = conv.handle_classification("s", "r", "Esca", f32::NAN).unwrap_err();
    assert!(matches!(err.downcast_ref::<Error>(), Some(Error::MalformedInput(_))));
    assert!(conv.handle_classification("s", "r", "", 0.9).is_err());
    assert!(log.history("s", "r").unwrap().is_empty());
}

#[test]
fn confident_classification_answers_and_logs_summary() {
    let generator = Arc::new(RecordingGenerator::default());
    let (conv, log) = conversation(generator.clone());

    let reply = conv.handle_classification("s1", "r1", "Esca", 0.873).unwrap();
    assert!(reply.recognised);
    assert_eq!(reply.summary, "Gambar telah diproses menggunakan CNN dengan hasil prediksi kelas: Esca dengan confidence: 0.87.");
    assert_eq!(reply.summary, classification_summary("Esca", 0.873));
    assert_eq!(reply.answer, "Black rot adalah penyakit jamur pada daun anggur.");
    assert!(generator.last_prompt().contains("**Esca**"));

    let turns = log.history("s1", "r1").unwrap();
    assert_eq!(turns.len(), 2);
    assert_eq!(turns[0].text, reply.summary);
    assert_eq!(turns[1].text, reply.answer);
}

#[test]
fn low_confidence_classification_skips_answering() {
    let generator = Arc::new(RecordingGenerator::default());
    let (conv, log) = conversation(generator.clone());

    for confidence in [0.1, 0.45] {
        let reply = conv.handle_classification("s1", "r1", "Esca", confidence).unwrap();
        assert!(!reply.recognised);
        assert_eq!(reply.summary, "Gambar tidak dikenali sebagai penyakit tanaman.");
        assert!(reply.answer.starts_with("Mohon unggah gambar yang jelas"));
    }
    assert!(generator.prompts.lock().unwrap().is_empty());
    assert!(log.history("s1", "r1").unwrap().is_empty());
}

#[test]
fn generation_failure_is_logged_as_apology() {
    let (conv, log) = conversation(Arc::new(FailingGenerator));
    assert_eq!(conv.handle_text("s1", "r1", "Apa itu black rot?").unwrap(), APOLOGY_MESSAGE);
    assert_eq!(log.history("s1", "r1").unwrap()[1].text, APOLOGY_MESSAGE);
}

#[test]
fn concurrent_turns_in_one_room_stay_paired() {
    let (conv, log) = conversation(Arc::new(RecordingGenerator::default()));
    let conv = Arc::new(conv);
    let handles: Vec<_> = (0..6)
        .map(|i| {
            let conv = conv.clone();
            thread::spawn(move || conv.handle_text("s1", "r1", &format!("pertanyaan {i}")).unwrap())
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }
    let turns = log.history("s1", "r1").unwrap();
    assert_eq!(turns.len(), 12);
    for pair in turns.chunks(2) {
        assert_eq!((pair[0].role, pair[1].role), (Role::User, Role::Ai));
    }
    assert_eq!(conv.open_rooms(), 0);
}

#[test]
fn room_registry_empties_after_many_rooms() {
    let (conv, log) = conversation(Arc::new(RecordingGenerator::default()));
    let conv = Arc::new(conv);
    let handles: Vec<_> = (0..8)
        .map(|i| {
            let conv = conv.clone();
            thread::spawn(move || {
                let room = format!("r{}", i % 3);
                conv.handle_text("s1", &room, "apa itu esca?").unwrap();
                conv.handle_classification("s1", &room, "Esca", 0.9).unwrap();
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }
    assert_eq!(conv.open_rooms(), 0);
    let total: usize = (0..3).map(|r| log.history("s1", &format!("r{r}")).unwrap().len()).sum();
    assert_eq!(total, 32);
}
