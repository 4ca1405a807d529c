//! Order extraction: turns a caller utterance into a candidate
//! (product, quantity) pair via a remote text-completion call.
//!
//! This is a best-effort NLU shim, not a guaranteed parser. Every failure
//! mode — network error, timeout, rejected request, unparseable reply —
//! degrades to [`Extraction::Unrecognized`] so the dialogue engine can
//! re-prompt; nothing here ever errors out to a caller.

pub mod llm;
pub mod parser;

use async_trait::async_trait;
use tracing::{debug, warn};

use storeline_core::{Extraction, OrderExtraction};

pub use llm::{ExtractorError, HttpLlmClient, LlmClient};

const INSTRUCTION: &str = "You are an order parser for a general store. \
Extract the product name and quantity from the customer's request. \
Answer with exactly two lines:\nProduct: <name>\nQuantity: <number>\n\
If no product is mentioned, answer with:\nProduct: unknown";

pub struct OrderExtractor<C> {
    client: C,
}

impl<C> OrderExtractor<C>
where
    C: LlmClient,
{
    pub fn new(client: C) -> Self {
        Self { client }
    }

    fn build_prompt(utterance: &str) -> String {
        format!("{INSTRUCTION}\n\nCustomer request: {utterance}")
    }
}

#[async_trait]
impl<C> OrderExtraction for OrderExtractor<C>
where
    C: LlmClient,
{
    async fn extract(&self, utterance: &str) -> Extraction {
        if utterance.trim().is_empty() {
            return Extraction::Unrecognized;
        }

        let reply = match self.client.complete(&Self::build_prompt(utterance)).await {
            Ok(reply) => reply,
            Err(error) => {
                warn!(
                    event_name = "extractor.completion_failed",
                    error = %error,
                    "completion call failed; treating turn as unrecognized"
                );
                return Extraction::Unrecognized;
            }
        };

        match parser::parse_candidate(&reply) {
            Some(parsed) => {
                debug!(
                    event_name = "extractor.candidate_parsed",
                    product = %parsed.product,
                    quantity = parsed.quantity,
                    "candidate order parsed from completion reply"
                );
                Extraction::Candidate { product: parsed.product, quantity: parsed.quantity }
            }
            None => {
                debug!(
                    event_name = "extractor.reply_unusable",
                    "completion reply carried no usable product"
                );
                Extraction::Unrecognized
            }
        }
    }
}
