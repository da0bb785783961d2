//! Conversational retrieval chain.
//!
//! Multi-turn question answering over the ingested tenders. A follow-up
//! question ("what about the warranty?") is first condensed against the
//! recent history into a standalone question, which is what gets embedded
//! and retrieved; otherwise the retriever only sees the fragment. The
//! answer prompt then restricts the model to the retrieved context, and the
//! sources that grounded the answer are returned for citation rendering.

use anyhow::Result;
use std::io::{BufRead, Write};

use crate::config::Config;
use crate::llm;
use crate::models::{ChatAnswer, ChatTurn, RetrievedChunk};
use crate::retrieval::{self, citation_link, Retriever};
use crate::store::VectorStore;

const NO_CONTEXT_ANSWER: &str =
    "No relevant context found in the ingested documents. Ingest the tender PDFs first.";

/// Chat history with a sliding window: only the most recent
/// `history_turns` exchanges are replayed to the model.
pub struct ChatSession {
    turns: Vec<ChatTurn>,
    window: usize,
}

impl ChatSession {
    pub fn new(window: usize) -> Self {
        Self {
            turns: Vec::new(),
            window,
        }
    }

    pub fn push(&mut self, question: &str, answer: &str) {
        self.turns.push(ChatTurn {
            question: question.to_string(),
            answer: answer.to_string(),
        });
    }

    /// The turns inside the window, oldest first.
    pub fn recent(&self) -> &[ChatTurn] {
        let start = self.turns.len().saturating_sub(self.window);
        &self.turns[start..]
    }
}

/// Answer one question against the store, using (and not mutating) the
/// session history.
pub async fn answer(
    config: &Config,
    store: &dyn VectorStore,
    session: &ChatSession,
    question: &str,
) -> Result<ChatAnswer> {
    let history = session.recent();

    // Follow-ups need the history folded in before retrieval. If the
    // rewrite call fails, retrieving with the raw question still works.
    let standalone = if history.is_empty() {
        question.to_string()
    } else {
        match llm::generate(&config.llm, &condense_prompt(history, question)).await {
            Ok(rewritten) if !rewritten.trim().is_empty() => rewritten,
            _ => question.to_string(),
        }
    };

    let retriever = Retriever::new(config, store);
    let chunks = retriever
        .retrieve(&standalone, config.retrieval.chat_k)
        .await?;

    if chunks.is_empty() {
        return Ok(ChatAnswer {
            answer: NO_CONTEXT_ANSWER.to_string(),
            sources: Vec::new(),
        });
    }

    let prompt = answer_prompt(&chunks, history, question);
    let answer = llm::generate(&config.llm, &prompt).await?;

    Ok(ChatAnswer {
        answer,
        sources: retrieval::collect_sources(&chunks),
    })
}

fn condense_prompt(history: &[ChatTurn], question: &str) -> String {
    let mut prompt = String::from(
        "Given the following conversation and a follow-up question, rephrase the \
         follow-up question to be a standalone question that keeps all context \
         needed to search tender documents. Return only the standalone question.\n\n\
         Conversation:\n",
    );
    for turn in history {
        prompt.push_str(&format!("User: {}\nAssistant: {}\n", turn.question, turn.answer));
    }
    prompt.push_str(&format!("\nFollow-up question: {}\n", question));
    prompt
}

fn answer_prompt(chunks: &[RetrievedChunk], history: &[ChatTurn], question: &str) -> String {
    let mut prompt = String::from(
        "You are assisting with questions about tender documents. Answer using \
         only the context below. If the context does not contain the answer, \
         say so instead of guessing.\n\nContext:\n",
    );
    for (i, chunk) in chunks.iter().enumerate() {
        prompt.push_str(&format!(
            "[{}] ({} p.{})\n{}\n\n",
            i + 1,
            chunk.document_name,
            chunk.page,
            chunk.text.trim()
        ));
    }

    if !history.is_empty() {
        prompt.push_str("Recent conversation:\n");
        for turn in history {
            prompt.push_str(&format!(
                "User: {}\nAssistant: {}\n",
                turn.question, turn.answer
            ));
        }
        prompt.push('\n');
    }

    prompt.push_str(&format!("Question: {}\nAnswer:", question));
    prompt
}

fn print_answer(config: &Config, answer: &ChatAnswer) {
    println!("{}", answer.answer);
    for source in &answer.sources {
        if source.pages.is_empty() {
            println!("  source: {}", source.document_name);
            continue;
        }
        let links: Vec<String> = source
            .pages
            .iter()
            .map(|page| citation_link(&config.server.public_url, &source.document_name, *page))
            .collect();
        println!(
            "  source: {} p.{} — {}",
            source.document_name,
            retrieval::pages_display(&source.pages),
            links.join(" ")
        );
    }
}

/// Run `tdk ask`: a single question, no history.
pub async fn run_ask(config: &Config, store: &dyn VectorStore, question: &str) -> Result<()> {
    let session = ChatSession::new(config.chat.history_turns);
    let result = answer(config, store, &session, question).await?;
    print_answer(config, &result);
    Ok(())
}

/// Run `tdk chat`: a line-oriented REPL on stdin. Empty line or EOF exits.
pub async fn run_repl(config: &Config, store: &dyn VectorStore) -> Result<()> {
    let mut session = ChatSession::new(config.chat.history_turns);
    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout();

    println!("tenderdesk chat — ask about the ingested tenders (empty line to exit)");

    loop {
        print!("> ");
        stdout.flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let question = line.trim();
        if question.is_empty() {
            break;
        }

        match answer(config, store, &session, question).await {
            Ok(result) => {
                print_answer(config, &result);
                session.push(question, &result.answer);
            }
            Err(e) => {
                tracing::warn!("chat turn failed: {e:#}");
                println!("error: {e:#}");
            }
        }
        println!();
    }

    Ok(())
}
