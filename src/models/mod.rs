pub mod vocabulary;

pub use vocabulary::{Association, Book, Page, VocabularyPair};
