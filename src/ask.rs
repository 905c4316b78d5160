//! `nile ask` and `nile chat`.
//!
//! Both post to `POST /ask`, which needs no authentication. `chat` keeps
//! the exchanges of the current loop in memory only; nothing is written to
//! disk.

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::api::ApiClient;
use crate::config::Config;
use crate::error::ApiError;
use crate::models::{AskRequest, AskResponse, Language};

/// Optional weather context sent with a question.
#[derive(Debug, Clone, Default)]
pub struct Place {
    pub location: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl Place {
    fn apply(&self, mut request: AskRequest) -> AskRequest {
        if let Some(ref location) = self.location {
            request = request.with_location(location.clone());
        }
        if let (Some(lat), Some(lon)) = (self.latitude, self.longitude) {
            request = request.with_coordinates(lat, lon);
        }
        request
    }
}

pub async fn run_ask(config: &Config, question: &str, lang: Language, place: &Place) -> Result<()> {
    let api = ApiClient::from_config(config);
    let request = place.apply(AskRequest::new(question, lang));
    let response = api.ask(&request).await.context("Question failed")?;
    print!("{}", format_answer(&response));
    Ok(())
}

/// One question/answer pair of an interactive chat.
#[derive(Debug, Clone)]
pub struct Exchange {
    pub question: String,
    pub response: AskResponse,
}

/// Read questions from stdin until EOF or `/quit`.
///
/// `/history` reprints the exchanges of this loop. A failed question is
/// reported and the loop continues; the user decides whether to retry.
pub async fn run_chat(config: &Config, lang: Language, place: &Place) -> Result<()> {
    let api = ApiClient::from_config(config);
    let mut history: Vec<Exchange> = Vec::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    println!(
        "Ask a question ({}). Type /history to review, /quit to leave.",
        lang.display_name()
    );
    loop {
        eprint!("> ");
        let Some(line) = lines.next_line().await.context("Failed to read from stdin")? else {
            break;
        };
        let question = line.trim();
        match question {
            "" => continue,
            "/quit" | "/exit" => break,
            "/history" => {
                for (i, ex) in history.iter().enumerate() {
                    println!("[{}] Q: {}", i + 1, ex.question);
                    print!("{}", format_answer(&ex.response));
                }
                continue;
            }
            _ => {}
        }

        let request = place.apply(AskRequest::new(question, lang));
        match api.ask(&request).await {
            Ok(response) => {
                print!("{}", format_answer(&response));
                history.push(Exchange {
                    question: question.to_string(),
                    response,
                });
            }
            Err(e @ (ApiError::MissingBaseUrl | ApiError::InvalidBaseUrl { .. })) => {
                return Err(e.into())
            }
            Err(e) => eprintln!("Error: {}", e),
        }
    }
    Ok(())
}

pub fn format_answer(response: &AskResponse) -> String {
    let mut out = format!("{}\n", response.answer.trim());
    if !response.sources.is_empty() {
        let sources: Vec<String> = response
            .sources
            .iter()
            .map(|s| match s.as_str() {
                Some(text) => text.to_string(),
                None => s.to_string(),
            })
            .collect();
        out.push_str(&format!("sources: {}\n", sources.join(", ")));
    }
    out
}
