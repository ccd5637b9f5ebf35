//! In-memory fakes and canned model output shared by the interview tests.
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::errors::{AppError, Capability, UpstreamError};
use crate::interview::answer_evaluator::{parse_answer_evaluation, AnswerEvaluator, TemplateAnswerEvaluator};
use crate::interview::archive::ReportArchive;
use crate::interview::lock::LocalTurnLock;
use crate::interview::overall_evaluator::TemplateOverallEvaluator;
use crate::interview::owners::OwnerDirectory;
use crate::interview::question_generator::QuestionGenerator;
use crate::interview::session::{InterviewSession, SessionParts, TerminationPolicy};
use crate::interview::store::{AppendOutcome, InterviewStore};
use crate::llm_client::LanguageModel;
use crate::models::interview::{Interview, InterviewStatus, OverallEvaluation, QuestionRound};
use crate::models::user::User;
use crate::resume::ResumeExtractor;
use crate::speech::{SpeechRecognizer, SpeechTranscriber, TranscriptionOptions};

pub const OWNER: &str = "owner-1";

pub const ANSWER_RESPONSE: &str = "\
Clarity Score (1-10): 7
- Brief explanation: The answer followed a clear structure.

Technical Accuracy Score (1-10): 8
- Brief explanation: Correctly described B-tree indexes.

Language & Communication Score (1-10): 6
- Brief explanation: Some filler words but understandable.

Key Strengths:
- Structured answer
- Correct terminology
- Concrete example

Areas to Improve:
- Fewer filler words
- Mention trade-offs
- Tighter conclusion

Recommendations:
- Practice concise delivery
- Review composite indexes
- Prepare a latency anecdote

Overall Score (1-10): 7
";

pub const OVERALL_RESPONSE: &str = "\
Overall Technical Proficiency (1-10): 8
- Brief explanation: Strong grasp of database internals across answers.

Communication Skills (1-10): 7
- Brief explanation: Clear but occasionally hesitant delivery.

Problem-Solving Ability (1-10): 8
- Brief explanation: Broke problems down methodically.

Key Strengths:
- Deep knowledge of Postgres internals
- Structured explanations
- Practical production experience

Areas for Growth:
- Reduce filler words
- Discuss trade-offs earlier
- Quantify impact

Final Recommendations:
- Practice system design mock interviews
- Prepare concise project summaries
- Review distributed consensus

Hiring Recommendation: HIRE
- Justification: Solid technical depth with room to polish communication. Would perform well on the team.

Overall Interview Score (1-10): 8
";

pub fn sample_round(question: &str) -> QuestionRound {
    QuestionRound {
        question: question.to_string(),
        answer: "I um used a B-tree index on the lookup column.".to_string(),
        evaluation: parse_answer_evaluation(ANSWER_RESPONSE),
        timestamp: Utc::now(),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Language model
// ────────────────────────────────────────────────────────────────────────────

/// Answers by prompt shape: overall template, answer template, otherwise a question.
#[derive(Default)]
pub struct ScriptedLlm {
    questions: Mutex<VecDeque<String>>,
    answer_evaluation: Option<String>,
    overall_evaluations: Mutex<VecDeque<String>>,
    always_fail: bool,
    fail_questions: AtomicBool,
    fail_overall: AtomicBool,
    questions_generated: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedLlm {
    pub fn with_questions(self, questions: Vec<String>) -> Self {
        *self.questions.lock().unwrap() = questions.into();
        self
    }

    pub fn with_answer_evaluation(mut self, text: &str) -> Self {
        self.answer_evaluation = Some(text.to_string());
        self
    }

    /// Served in order to overall prompts; afterwards `OVERALL_RESPONSE`.
    pub fn with_overall_evaluations(self, responses: Vec<String>) -> Self {
        *self.overall_evaluations.lock().unwrap() = responses.into();
        self
    }

    pub fn failing(mut self) -> Self {
        self.always_fail = true;
        self
    }

    pub fn fail_questions(&self, fail: bool) {
        self.fail_questions.store(fail, Ordering::SeqCst);
    }

    pub fn fail_overall(&self, fail: bool) {
        self.fail_overall.store(fail, Ordering::SeqCst);
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl LanguageModel for ScriptedLlm {
    async fn generate_content(&self, prompt: &str) -> Result<String, UpstreamError> {
        let service = Capability::LanguageModel;
        self.prompts.lock().unwrap().push(prompt.to_string());
        if self.always_fail {
            return Err(UpstreamError::RateLimited { service });
        }

        if prompt.contains("Overall Interview Score") {
            if self.fail_overall.load(Ordering::SeqCst) {
                return Err(UpstreamError::Unavailable { service, status: 503 });
            }
            let scripted = self.overall_evaluations.lock().unwrap().pop_front();
            return Ok(scripted.unwrap_or_else(|| OVERALL_RESPONSE.to_string()));
        }

        if prompt.contains("Clarity Score (1-10)") {
            return Ok(self
                .answer_evaluation
                .clone()
                .unwrap_or_else(|| ANSWER_RESPONSE.to_string()));
        }

        if self.fail_questions.load(Ordering::SeqCst) {
            return Err(UpstreamError::QuotaExceeded { service });
        }
        if let Some(q) = self.questions.lock().unwrap().pop_front() {
            return Ok(q);
        }
        let n = self.questions_generated.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(format!("  Question {n}?\n"))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Store and owners
// ────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct InMemoryInterviewStore {
    interviews: Mutex<HashMap<Uuid, Interview>>,
}

impl InMemoryInterviewStore {
    pub fn insert(&self, interview: Interview) {
        self.interviews.lock().unwrap().insert(interview.id, interview);
    }

    pub fn get(&self, id: Uuid) -> Option<Interview> {
        self.interviews.lock().unwrap().get(&id).cloned()
    }
}

#[async_trait]
impl InterviewStore for InMemoryInterviewStore {
    async fn create(&self, interview: &Interview) -> Result<(), AppError> {
        self.insert(interview.clone());
        Ok(())
    }

    async fn find(&self, id: Uuid) -> Result<Option<Interview>, AppError> {
        Ok(self.get(id))
    }

    async fn list_for_owner(&self, owner_id: &str) -> Result<Vec<Interview>, AppError> {
        let mut found: Vec<Interview> = self
            .interviews
            .lock()
            .unwrap()
            .values()
            .filter(|i| i.owner_id == owner_id)
            .cloned()
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(found)
    }

    async fn set_status(
        &self,
        id: Uuid,
        from: &[InterviewStatus],
        to: InterviewStatus,
    ) -> Result<Option<Interview>, AppError> {
        let mut interviews = self.interviews.lock().unwrap();
        Ok(interviews
            .get_mut(&id)
            .filter(|i| from.contains(&i.status))
            .map(|i| {
                i.status = to;
                i.updated_at = Utc::now();
                i.clone()
            }))
    }

    async fn append_round(
        &self,
        id: Uuid,
        expected_rounds: usize,
        round: &QuestionRound,
    ) -> Result<AppendOutcome, AppError> {
        let mut interviews = self.interviews.lock().unwrap();
        let Some(interview) = interviews.get_mut(&id) else {
            return Ok(AppendOutcome::NotFound);
        };
        if interview.status.is_terminal() || interview.questions.len() != expected_rounds {
            return Ok(AppendOutcome::Conflict);
        }
        interview.questions.push(round.clone());
        interview.status = InterviewStatus::InProgress;
        interview.updated_at = Utc::now();
        Ok(AppendOutcome::Appended(interview.clone()))
    }

    async fn complete(
        &self,
        id: Uuid,
        evaluation: &OverallEvaluation,
    ) -> Result<Option<Interview>, AppError> {
        let mut interviews = self.interviews.lock().unwrap();
        let Some(interview) = interviews.get_mut(&id) else {
            return Ok(None);
        };
        if interview.status != InterviewStatus::InProgress || interview.overall_evaluation.is_some()
        {
            return Ok(None);
        }
        interview.overall_evaluation = Some(evaluation.clone());
        interview.status = InterviewStatus::Completed;
        interview.updated_at = Utc::now();
        Ok(Some(interview.clone()))
    }
}

pub struct StaticOwners {
    known: HashSet<String>,
}

impl StaticOwners {
    pub fn new<const N: usize>(owners: [&str; N]) -> Self {
        Self {
            known: owners.iter().map(|o| o.to_string()).collect(),
        }
    }
}

#[async_trait]
impl OwnerDirectory for StaticOwners {
    async fn find_owner(&self, owner_id: &str) -> Result<Option<User>, AppError> {
        Ok(self.known.contains(owner_id).then(|| User {
            id: Uuid::new_v4(),
            external_id: owner_id.to_string(),
            email: format!("{owner_id}@example.com"),
            tier: "free".to_string(),
            created_at: Utc::now(),
        }))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Speech, resume, archive
// ────────────────────────────────────────────────────────────────────────────

pub struct FakeRecognizer {
    transcript: Option<String>,
    calls: AtomicUsize,
    last_mimetype: Mutex<Option<String>>,
}

impl FakeRecognizer {
    pub fn returning(transcript: &str) -> Self {
        Self {
            transcript: Some(transcript.to_string()),
            calls: AtomicUsize::new(0),
            last_mimetype: Mutex::new(None),
        }
    }

    pub fn failing() -> Self {
        Self {
            transcript: None,
            calls: AtomicUsize::new(0),
            last_mimetype: Mutex::new(None),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_mimetype(&self) -> Option<String> {
        self.last_mimetype.lock().unwrap().clone()
    }
}

#[async_trait]
impl SpeechRecognizer for FakeRecognizer {
    async fn transcribe(
        &self,
        _audio: &[u8],
        options: &TranscriptionOptions,
    ) -> Result<String, UpstreamError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_mimetype.lock().unwrap() = Some(options.mimetype.clone());
        self.transcript
            .clone()
            .ok_or(UpstreamError::Unavailable {
                service: Capability::SpeechRecognition,
                status: 503,
            })
    }
}

pub struct FakeExtractor {
    text: Option<String>,
}

impl FakeExtractor {
    pub fn returning(text: &str) -> Self {
        Self {
            text: Some(text.to_string()),
        }
    }

    pub fn failing() -> Self {
        Self { text: None }
    }
}

#[async_trait]
impl ResumeExtractor for FakeExtractor {
    async fn extract_text(&self, _bytes: Vec<u8>) -> Result<String, AppError> {
        self.text.clone().ok_or_else(|| {
            UpstreamError::UnreadableDocument {
                detail: "fake extractor".to_string(),
            }
            .into()
        })
    }
}

#[derive(Default)]
pub struct RecordingArchive {
    stored: Mutex<Vec<Uuid>>,
    fail: bool,
}

impl RecordingArchive {
    pub fn failing() -> Self {
        Self {
            stored: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn stored(&self) -> Vec<Uuid> {
        self.stored.lock().unwrap().clone()
    }
}

#[async_trait]
impl ReportArchive for RecordingArchive {
    async fn store_report(&self, interview: &Interview) -> anyhow::Result<String> {
        if self.fail {
            anyhow::bail!("bucket unavailable");
        }
        self.stored.lock().unwrap().push(interview.id);
        Ok(format!("interviews/{}/{}.md", interview.owner_id, interview.id))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Harness
// ────────────────────────────────────────────────────────────────────────────

/// Wires an `InterviewSession` to fakes and keeps handles for assertions.
pub struct Harness {
    pub store: Arc<InMemoryInterviewStore>,
    pub llm: Arc<ScriptedLlm>,
    pub lock: Arc<LocalTurnLock>,
    pub archive: Arc<RecordingArchive>,
    pub recognizer: Arc<FakeRecognizer>,
    pub extractor: Arc<FakeExtractor>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_llm(ScriptedLlm::default())
    }

    pub fn with_llm(llm: ScriptedLlm) -> Self {
        Self {
            store: Arc::new(InMemoryInterviewStore::default()),
            llm: Arc::new(llm),
            lock: Arc::new(LocalTurnLock::default()),
            archive: Arc::new(RecordingArchive::default()),
            recognizer: Arc::new(FakeRecognizer::returning("I um used a B-tree index .")),
            extractor: Arc::new(FakeExtractor::returning("Rust, Postgres, Kafka")),
        }
    }

    pub fn with_recognizer(mut self, recognizer: FakeRecognizer) -> Self {
        self.recognizer = Arc::new(recognizer);
        self
    }

    pub fn with_extractor(mut self, extractor: FakeExtractor) -> Self {
        self.extractor = Arc::new(extractor);
        self
    }

    pub fn with_archive(mut self, archive: RecordingArchive) -> Self {
        self.archive = Arc::new(archive);
        self
    }

    pub fn session(&self) -> InterviewSession {
        InterviewSession::new(self.parts())
    }

    pub fn session_with_evaluator(&self, evaluator: Arc<dyn AnswerEvaluator>) -> InterviewSession {
        InterviewSession::new(SessionParts {
            answer_evaluator: evaluator,
            ..self.parts()
        })
    }

    /// Same fakes, but persistence goes through `store` (usually a wrapper
    /// around `self.store`).
    pub fn session_with_store(&self, store: Arc<dyn InterviewStore>) -> InterviewSession {
        InterviewSession::new(SessionParts {
            store,
            ..self.parts()
        })
    }

    fn parts(&self) -> SessionParts {
        SessionParts {
            store: self.store.clone(),
            owners: Arc::new(StaticOwners::new([OWNER])),
            resumes: self.extractor.clone(),
            transcriber: SpeechTranscriber::new(self.recognizer.clone()),
            questions: QuestionGenerator::new(self.llm.clone()),
            answer_evaluator: Arc::new(TemplateAnswerEvaluator::new(self.llm.clone())),
            overall_evaluator: Arc::new(TemplateOverallEvaluator::new(self.llm.clone())),
            turn_lock: self.lock.clone(),
            archive: self.archive.clone(),
            policy: TerminationPolicy::default(),
        }
    }
}
