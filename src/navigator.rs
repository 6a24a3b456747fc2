use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use indexmap::IndexMap;
use serde::Serialize;
use thiserror::Error;
use url::Url;

use crate::completion::{CompletionError, CompletionRequest, CompletionService, Message};
use crate::config::NavigatorConfig;
use crate::fetch::PageFetcher;
use crate::filter::parse_and_normalize;
use crate::prompts;
use crate::results::{Answer, Question, QuestionInput, SearchOutcome};
use crate::schema::{self, FormattedQuestions, LinkChoice, PageAnalysis};

/// Document of every page fetched so far, keyed by normalized URL. Shared
/// across questions, inspectable, and seedable before a run.
pub type PageCache = IndexMap<String, String>;

/// Errors that abort a whole `find_answers` call
#[derive(Debug, Error)]
pub enum NavigatorError {
    #[error("Completion service failed: {0}")]
    Completion(#[from] CompletionError),

    #[error("Could not turn the input into questions: {0}")]
    MalformedQuestions(#[from] schema::MalformedModelOutput),

    #[error("Failed to encode the questions payload: {0}")]
    QuestionEncoding(#[from] serde_json::Error),

    #[error("Invalid base URL {url:?}: {source}")]
    InvalidBaseUrl {
        url: String,
        source: url::ParseError,
    },
}

/// Answers questions about a website by walking model-selected links from the
/// configured base URL. Questions are processed one at a time; each search
/// ends in exactly one `SearchOutcome`.
pub struct Navigator {
    config: NavigatorConfig,
    completion: Arc<dyn CompletionService>,
    fetcher: Arc<dyn PageFetcher>,
    page_cache: PageCache,
}

impl Navigator {
    pub fn new(
        config: NavigatorConfig,
        completion: Arc<dyn CompletionService>,
        fetcher: Arc<dyn PageFetcher>,
    ) -> Self {
        Self {
            config,
            completion,
            fetcher,
            page_cache: PageCache::new(),
        }
    }

    pub fn config(&self) -> &NavigatorConfig {
        &self.config
    }

    /// Documents of every page fetched so far, in fetch order
    pub fn page_cache(&self) -> &PageCache {
        &self.page_cache
    }

    /// Pre-load a page document, e.g. carried over from an earlier run
    pub fn seed_page(&mut self, url: &str, document: impl Into<String>) {
        let key = match parse_and_normalize(url) {
            Some(parsed) => parsed.to_string(),
            None => url.to_string(),
        };
        self.page_cache.insert(key, document.into());
    }

    /// Answer each question with exactly one Answer, in question order.
    ///
    /// The input is normalized through the question-formatter prompt first;
    /// ids from the formatter are kept (first occurrence wins on duplicates).
    /// Completion transport failures abort the whole call; an exhausted
    /// search only yields a not-found answer for its own question.
    pub async fn find_answers(
        &mut self,
        input: impl Into<QuestionInput>,
    ) -> Result<Vec<Answer>, NavigatorError> {
        let input = input.into();
        let questions = self.format_questions(&input).await?;

        let base = Url::parse(&self.config.base_url).map_err(|source| {
            NavigatorError::InvalidBaseUrl {
                url: self.config.base_url.clone(),
                source,
            }
        })?;

        ::log::info!(
            "Starting the search: {} question(s) against {}",
            questions.len(),
            base
        );

        let mut answers = Vec::with_capacity(questions.len());
        for question in &questions {
            ::log::info!("Processing question {}: {:?}", question.id, question.text);
            let outcome = self.find_answer_for_question(&base, &question.text).await?;
            answers.push(outcome.into_answer(&question.id));
        }
        Ok(answers)
    }

    /// Normalize caller input into an ordered list of questions with ids
    async fn format_questions(
        &self,
        input: &QuestionInput,
    ) -> Result<Vec<Question>, NavigatorError> {
        let payload = serde_json::to_string(input)?;
        let request = CompletionRequest::json(vec![
            Message::system(prompts::QUESTION_FORMATTER),
            Message::user(prompts::format_questions_user(&payload)),
        ]);

        let reply = self.completion.complete(&request).await?;
        let formatted =
            match schema::parse_model_json::<FormattedQuestions>("formatted questions", &reply) {
                Ok(formatted) => formatted,
                Err(first_err) => {
                    ::log::warn!("{first_err}; retrying once");
                    let retry = request.with_retry_turn(&reply, prompts::JSON_RETRY);
                    let reply = self.completion.complete(&retry).await?;
                    schema::parse_model_json::<FormattedQuestions>("formatted questions", &reply)?
                }
            };

        // The formatter is told to neither invent nor drop ids, but its output
        // is still model text
        let mut seen = HashSet::new();
        let mut questions = Vec::with_capacity(formatted.result.len());
        for question in formatted.result {
            if seen.insert(question.id.clone()) {
                questions.push(question);
            } else {
                ::log::warn!("Dropping duplicate question id {:?} from formatter", question.id);
            }
        }
        Ok(questions)
    }

    /// Search for one question's answer, starting at the base URL.
    ///
    /// The loop holds the per-question state: the depth spent on link-follow
    /// hops, the queue of model-suggested links, and the set of URLs already
    /// analyzed for this question. Pages whose fetch or analysis fails are
    /// stepped past at the same depth; only following a fresh suggested link
    /// costs depth. When the queue holds nothing but already-explored entries,
    /// target selection falls through to the global jump.
    async fn find_answer_for_question(
        &mut self,
        base: &Url,
        question: &str,
    ) -> Result<SearchOutcome, NavigatorError> {
        let mut depth: usize = 0;
        let mut queue: VecDeque<String> = VecDeque::new();
        let mut explored: HashSet<String> = HashSet::new();

        loop {
            if depth > self.config.max_depth {
                ::log::warn!("Max depth reached, stopping this search");
                return Ok(SearchOutcome::NotFound);
            }

            // Pick the next target: the base page first, then queued links,
            // then a jump back through everything already fetched
            let current_url = if depth == 0 {
                base.to_string()
            } else if let Some(queued) = pop_unexplored(&mut queue, &explored) {
                queued
            } else {
                match self.decide_best_next_page(question).await? {
                    Some(choice) if !explored.contains(&choice) => choice,
                    Some(choice) => {
                        ::log::info!("Suggested page already explored, stopping: {}", choice);
                        return Ok(SearchOutcome::NotFound);
                    }
                    None => return Ok(SearchOutcome::NotFound),
                }
            };

            // Block re-entry for this question even when the fetch fails
            explored.insert(current_url.clone());

            let document = match self.page_document(&current_url).await {
                Some(document) => document,
                None if !queue.is_empty() => continue,
                None => return Ok(SearchOutcome::NotFound),
            };

            ::log::info!("Analyzing page: {}", current_url);
            let analysis = match self.analyze_page(question, &document).await? {
                Some(analysis) => analysis,
                // Malformed twice; treat the page like a failed fetch
                None if !queue.is_empty() => continue,
                None => return Ok(SearchOutcome::NotFound),
            };

            let decision = decide_step(
                &analysis,
                &explored,
                self.config.min_confidence,
                self.config.max_next_links,
            );
            match decision {
                StepDecision::Answer { answer, confidence } => {
                    ::log::info!("Found answer with {}% confidence", confidence);
                    return Ok(SearchOutcome::Answered { answer, confidence });
                }
                StepDecision::Follow(links) => {
                    let mut links = links.into_iter();
                    if let Some(primary) = links.next() {
                        ::log::info!("Prioritizing path: {}", primary);
                        queue.push_front(primary);
                    }
                    queue.extend(links);
                    depth += 1;
                }
                StepDecision::Continue => {
                    if queue.is_empty() {
                        ::log::info!("No more promising leads found");
                        return Ok(SearchOutcome::NotFound);
                    }
                }
            }
        }
    }

    /// Document for `url`, from the cache when present. Fresh fetches are
    /// cached for every later question; analysis never is.
    async fn page_document(&mut self, url: &str) -> Option<String> {
        if let Some(document) = self.page_cache.get(url) {
            ::log::info!("Using cached content for {}", url);
            return Some(document.clone());
        }

        let parsed = parse_and_normalize(url)?;
        let page = self.fetcher.fetch(&parsed).await?;
        let document = page.into_document();
        self.page_cache.insert(url.to_string(), document.clone());
        Some(document)
    }

    /// Page analysis with one corrective retry. `Ok(None)` means the reply
    /// was malformed twice and the page should be stepped past.
    async fn analyze_page(
        &self,
        question: &str,
        document: &str,
    ) -> Result<Option<PageAnalysis>, CompletionError> {
        let request = CompletionRequest::json(vec![
            Message::system(prompts::PAGE_ANALYST),
            Message::user(prompts::analyze_page_user(question, document)),
        ]);

        let reply = self.completion.complete(&request).await?;
        let analysis = match schema::parse_model_json::<PageAnalysis>("page analysis", &reply) {
            Ok(analysis) => analysis,
            Err(first_err) => {
                ::log::warn!("{first_err}; retrying once");
                let retry = request.with_retry_turn(&reply, prompts::JSON_RETRY);
                let reply = self.completion.complete(&retry).await?;
                match schema::parse_model_json::<PageAnalysis>("page analysis", &reply) {
                    Ok(analysis) => analysis,
                    Err(err) => {
                        ::log::error!("{err}; skipping this page");
                        return Ok(None);
                    }
                }
            }
        };

        if let Some(reasoning) = &analysis.reasoning {
            ::log::debug!("Analysis: {}", reasoning);
        }
        Ok(Some(analysis))
    }

    /// When the local queue is dry, ask the model which already-fetched page
    /// holds the most promising unvisited link. Returns a normalized URL, or
    /// None when nothing clears the confidence gate.
    async fn decide_best_next_page(
        &self,
        question: &str,
    ) -> Result<Option<String>, CompletionError> {
        if self.page_cache.is_empty() {
            return Ok(None);
        }
        ::log::info!("Analyzing visited pages for the next best link");

        #[derive(Serialize)]
        struct PageEntry<'a> {
            url: &'a str,
            content: &'a str,
        }
        let pages: Vec<PageEntry> = self
            .page_cache
            .iter()
            .map(|(url, content)| PageEntry {
                url,
                content,
            })
            .collect();
        let payload = match serde_json::to_string(&pages) {
            Ok(payload) => payload,
            Err(err) => {
                ::log::error!("Failed to serialize visited pages: {}", err);
                return Ok(None);
            }
        };

        let request = CompletionRequest::json(vec![
            Message::system(prompts::LINK_NAVIGATOR),
            Message::user(prompts::select_link_user(question, &payload)),
        ]);

        let reply = self.completion.complete(&request).await?;
        let choice = match schema::parse_model_json::<LinkChoice>("link choice", &reply) {
            Ok(choice) => choice,
            Err(first_err) => {
                ::log::warn!("{first_err}; retrying once");
                let retry = request.with_retry_turn(&reply, prompts::JSON_RETRY);
                let reply = self.completion.complete(&retry).await?;
                match schema::parse_model_json::<LinkChoice>("link choice", &reply) {
                    Ok(choice) => choice,
                    Err(err) => {
                        ::log::error!("{err}; no jump target");
                        return Ok(None);
                    }
                }
            }
        };

        if let Some(reasoning) = &choice.reasoning {
            ::log::debug!("Link selection reasoning: {}", reasoning);
        }

        if choice.confidence > self.config.min_confidence {
            if let Some(url) = choice.selected_link.as_deref().and_then(parse_and_normalize) {
                ::log::info!(
                    "Selected next link with {}% confidence: {}",
                    choice.confidence,
                    url
                );
                return Ok(Some(url.to_string()));
            }
        }

        ::log::info!("No promising unvisited links found");
        Ok(None)
    }
}

/// What one page analysis tells the search loop to do next
#[derive(Debug, PartialEq, Eq)]
enum StepDecision {
    /// The page answered the question
    Answer {
        answer: Option<String>,
        confidence: u8,
    },

    /// Fresh links worth following: the first gets priority, depth advances
    Follow(Vec<String>),

    /// Nothing new here; drain the queue or stop
    Continue,
}

/// Decide what an analysis means for the search. An answer is accepted at any
/// confidence; suggested links only count when confidence clears the gate and
/// at least one of them is a valid URL not yet explored.
fn decide_step(
    analysis: &PageAnalysis,
    explored: &HashSet<String>,
    min_confidence: u8,
    max_next_links: usize,
) -> StepDecision {
    if analysis.has_answer {
        return StepDecision::Answer {
            answer: analysis.answer.clone(),
            confidence: analysis.confidence,
        };
    }

    if analysis.confidence > min_confidence {
        let fresh: Vec<String> = analysis
            .next_links
            .iter()
            .take(max_next_links)
            .filter_map(|link| parse_and_normalize(link))
            .map(|url| url.to_string())
            .filter(|url| !explored.contains(url))
            .collect();
        if !fresh.is_empty() {
            return StepDecision::Follow(fresh);
        }
    }

    StepDecision::Continue
}

/// First queue entry not yet explored; stale entries are dropped on the way
fn pop_unexplored(queue: &mut VecDeque<String>, explored: &HashSet<String>) -> Option<String> {
    while let Some(candidate) = queue.pop_front() {
        if !explored.contains(&candidate) {
            return Some(candidate);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analysis(has_answer: bool, confidence: u8, links: &[&str]) -> PageAnalysis {
        let json = serde_json::json!({
            "hasAnswer": has_answer,
            "answer": if has_answer { Some("the answer") } else { None },
            "nextLinks": links,
            "confidence": confidence,
        });
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_answer_accepted_at_any_confidence() {
        let explored = HashSet::new();
        let decision = decide_step(&analysis(true, 0, &[]), &explored, 30, 3);
        assert_eq!(
            decision,
            StepDecision::Answer {
                answer: Some("the answer".to_string()),
                confidence: 0
            }
        );
    }

    #[test]
    fn test_confidence_gate_is_strict() {
        let explored = HashSet::new();
        let links = ["https://example.com/a"];

        // Exactly at the gate: not enough
        let at_gate = decide_step(&analysis(false, 30, &links), &explored, 30, 3);
        assert_eq!(at_gate, StepDecision::Continue);

        let above_gate = decide_step(&analysis(false, 31, &links), &explored, 30, 3);
        assert_eq!(
            above_gate,
            StepDecision::Follow(vec!["https://example.com/a".to_string()])
        );
    }

    #[test]
    fn test_links_normalized_capped_and_filtered() {
        let mut explored = HashSet::new();
        explored.insert("https://example.com/a".to_string());

        let links = [
            "https://example.com/a",          // explored
            "https://example.com/b#section",  // fragment alias
            "not a url",                      // dropped
            "https://example.com/c",
            "https://example.com/d",          // beyond the cap
        ];
        let decision = decide_step(&analysis(false, 80, &links), &explored, 30, 3);

        // Cap applies to the suggestions (ranked by the model), then the
        // survivors are normalized and explored entries dropped
        assert_eq!(
            decision,
            StepDecision::Follow(vec!["https://example.com/b".to_string()])
        );
    }

    #[test]
    fn test_all_suggestions_explored_means_continue() {
        let mut explored = HashSet::new();
        explored.insert("https://example.com/a".to_string());
        explored.insert("https://example.com/b".to_string());

        let links = ["https://example.com/a", "https://example.com/b"];
        let decision = decide_step(&analysis(false, 80, &links), &explored, 30, 3);
        assert_eq!(decision, StepDecision::Continue);
    }

    #[test]
    fn test_no_answer_no_links_means_continue() {
        let explored = HashSet::new();
        let decision = decide_step(&analysis(false, 90, &[]), &explored, 30, 3);
        assert_eq!(decision, StepDecision::Continue);
    }

    #[test]
    fn test_pop_unexplored_drops_stale_entries() {
        let mut queue: VecDeque<String> = ["a", "b", "c"]
            .into_iter()
            .map(String::from)
            .collect();
        let mut explored = HashSet::new();
        explored.insert("a".to_string());
        explored.insert("b".to_string());

        assert_eq!(pop_unexplored(&mut queue, &explored), Some("c".to_string()));
        assert!(queue.is_empty());
        assert_eq!(pop_unexplored(&mut queue, &explored), None);
    }
}
