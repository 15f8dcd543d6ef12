use game_store::{CollectionPath, DocPath};

pub(crate) fn session_doc(session_id: &str) -> DocPath {
    CollectionPath::new("sessions").doc(session_id)
}

pub(crate) fn solved_words(session_id: &str) -> CollectionPath {
    CollectionPath::new(format!("sessions/{session_id}/solved_words"))
}

pub(crate) fn chat(session_id: &str) -> CollectionPath {
    CollectionPath::new(format!("sessions/{session_id}/chat_messages"))
}
