//! Interview session state machine.
//!
//! `pending → in_progress → {completed | cancelled}`. Every operation runs to
//! completion inside its request; stages within a round are awaited in order.
//!
//! Failure semantics:
//! - Transcription or answer-evaluation failure: nothing is persisted.
//! - Next-question failure after a round is appended: the round stays and the
//!   client can ask for a follow-up.
//! - Overall-evaluation failure: the interview stays `in_progress` with every
//!   round stored and can be completed later with `finalize`.
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::interview::answer_evaluator::AnswerEvaluator;
use crate::interview::archive::ReportArchive;
use crate::interview::lock::TurnLock;
use crate::interview::overall_evaluator::OverallEvaluator;
use crate::interview::owners::OwnerDirectory;
use crate::interview::question_generator::{QuestionContext, QuestionGenerator};
use crate::interview::store::{AppendOutcome, InterviewStore};
use crate::models::interview::{
    AnswerEvaluation, Interview, InterviewStatus, OverallEvaluation, QuestionRound,
};
use crate::resume::ResumeExtractor;
use crate::speech::{SpeechTranscriber, TranscriptionOptions};

/// Answered rounds after which an interview is evaluated as a whole.
pub const ROUNDS_PER_INTERVIEW: usize = 5;

/// Process-wide rule for when an interview has enough rounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TerminationPolicy {
    rounds_per_interview: usize,
}

impl Default for TerminationPolicy {
    fn default() -> Self {
        Self {
            rounds_per_interview: ROUNDS_PER_INTERVIEW,
        }
    }
}

impl TerminationPolicy {
    pub fn rounds(&self) -> usize {
        self.rounds_per_interview
    }

    pub fn is_complete(&self, answered_rounds: usize) -> bool {
        answered_rounds >= self.rounds_per_interview
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Operation results
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct StartedInterview {
    pub interview_id: Uuid,
    pub question: String,
    pub status: InterviewStatus,
}

/// Result of an answer submission (or a `finalize` retry).
#[derive(Debug, Clone, Serialize)]
pub struct SubmitOutcome {
    pub is_complete: bool,
    pub evaluation: AnswerEvaluation,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_question: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overall_evaluation: Option<OverallEvaluation>,
    /// The answer evaluation could not be fully parsed; some scores are 0.
    pub low_confidence: bool,
}

impl SubmitOutcome {
    fn next(evaluation: AnswerEvaluation, next_question: String) -> Self {
        Self {
            is_complete: false,
            low_confidence: evaluation.is_degraded(),
            evaluation,
            next_question: Some(next_question),
            overall_evaluation: None,
        }
    }

    fn completed(evaluation: AnswerEvaluation, overall: OverallEvaluation) -> Self {
        Self {
            is_complete: true,
            low_confidence: evaluation.is_degraded(),
            evaluation,
            next_question: None,
            overall_evaluation: Some(overall),
        }
    }
}

/// Everything a session needs, built once in `main` (or by tests).
pub struct SessionParts {
    pub store: Arc<dyn InterviewStore>,
    pub owners: Arc<dyn OwnerDirectory>,
    pub resumes: Arc<dyn ResumeExtractor>,
    pub transcriber: SpeechTranscriber,
    pub questions: QuestionGenerator,
    pub answer_evaluator: Arc<dyn AnswerEvaluator>,
    pub overall_evaluator: Arc<dyn OverallEvaluator>,
    pub turn_lock: Arc<dyn TurnLock>,
    pub archive: Arc<dyn ReportArchive>,
    pub policy: TerminationPolicy,
}

pub struct InterviewSession {
    store: Arc<dyn InterviewStore>,
    owners: Arc<dyn OwnerDirectory>,
    resumes: Arc<dyn ResumeExtractor>,
    transcriber: SpeechTranscriber,
    questions: QuestionGenerator,
    answer_evaluator: Arc<dyn AnswerEvaluator>,
    overall_evaluator: Arc<dyn OverallEvaluator>,
    turn_lock: Arc<dyn TurnLock>,
    archive: Arc<dyn ReportArchive>,
    policy: TerminationPolicy,
}

impl InterviewSession {
    pub fn new(parts: SessionParts) -> Self {
        let SessionParts {
            store,
            owners,
            resumes,
            transcriber,
            questions,
            answer_evaluator,
            overall_evaluator,
            turn_lock,
            archive,
            policy,
        } = parts;
        Self {
            store,
            owners,
            resumes,
            transcriber,
            questions,
            answer_evaluator,
            overall_evaluator,
            turn_lock,
            archive,
            policy,
        }
    }

    pub fn policy(&self) -> TerminationPolicy {
        self.policy
    }

    // ── Start ───────────────────────────────────────────────────────────────

    pub async fn start(
        &self,
        owner_id: &str,
        job_role: &str,
        resume: Vec<u8>,
    ) -> Result<StartedInterview, AppError> {
        let owner_id = owner_id.trim();
        let job_role = job_role.trim();
        if owner_id.is_empty() {
            return Err(AppError::Validation("owner_id is required".to_string()));
        }
        if job_role.is_empty() {
            return Err(AppError::Validation("Job role is required".to_string()));
        }
        if resume.is_empty() {
            return Err(AppError::Validation("Resume file is required".to_string()));
        }

        self.owners
            .find_owner(owner_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Owner {owner_id} not found")))?;

        let resume_text = self.resumes.extract_text(resume).await?;

        let interview = Interview::new(owner_id, job_role, resume_text);
        let id = interview.id;
        self.store.create(&interview).await?;
        info!("Interview {id} created for owner {owner_id} (role: {job_role})");

        let question = match self
            .questions
            .generate(&interview.resume_text, &interview.job_role, QuestionContext::Opening)
            .await
        {
            Ok(q) => q,
            Err(e) => {
                warn!("Interview {id}: opening question failed, cancelling: {e}");
                if let Err(cancel_err) = self
                    .store
                    .set_status(id, &[InterviewStatus::Pending], InterviewStatus::Cancelled)
                    .await
                {
                    error!("Interview {id}: failed to mark cancelled: {cancel_err}");
                }
                return Err(e);
            }
        };

        let interview = self
            .store
            .set_status(id, &[InterviewStatus::Pending], InterviewStatus::InProgress)
            .await?
            .ok_or_else(|| {
                AppError::Conflict(format!("Interview {id} changed before it could start"))
            })?;
        info!("Interview {id}: pending -> in_progress");

        Ok(StartedInterview {
            interview_id: id,
            question,
            status: interview.status,
        })
    }

    // ── Answer ──────────────────────────────────────────────────────────────

    pub async fn submit_answer(
        &self,
        id: Uuid,
        current_question: &str,
        audio: &[u8],
        audio_mimetype: Option<&str>,
    ) -> Result<SubmitOutcome, AppError> {
        let current_question = current_question.trim();
        if current_question.is_empty() {
            return Err(AppError::Validation("Current question is required".to_string()));
        }
        if audio.is_empty() {
            return Err(AppError::Validation("Audio answer is required".to_string()));
        }

        let token = self.turn_lock.try_acquire(id).await?.ok_or_else(|| {
            AppError::Conflict("Another answer for this interview is already being processed".to_string())
        })?;

        let result = self
            .answer_turn(id, current_question, audio, audio_mimetype)
            .await;

        if let Err(e) = self.turn_lock.release(id, token).await {
            warn!("Interview {id}: failed to release turn lock: {e}");
        }
        result
    }

    async fn answer_turn(
        &self,
        id: Uuid,
        current_question: &str,
        audio: &[u8],
        audio_mimetype: Option<&str>,
    ) -> Result<SubmitOutcome, AppError> {
        let interview = self.load(id).await?;
        self.ensure_accepts_answers(&interview)?;
        let answered = interview.questions.len();

        let options = TranscriptionOptions::default().with_mimetype(audio_mimetype);
        let transcript = self.transcriber.transcribe(audio, Some(&options)).await?;
        let evaluation = self
            .answer_evaluator
            .evaluate(current_question, &transcript)
            .await?;

        let round = QuestionRound {
            question: current_question.to_string(),
            answer: transcript,
            evaluation: evaluation.clone(),
            timestamp: Utc::now(),
        };

        let interview = match self.store.append_round(id, answered, &round).await? {
            AppendOutcome::Appended(interview) => interview,
            AppendOutcome::NotFound => {
                return Err(AppError::NotFound(format!("Interview {id} not found")))
            }
            AppendOutcome::Conflict => {
                warn!("Interview {id}: round {} lost an append race", answered + 1);
                return Err(AppError::Conflict(
                    "The interview changed while this answer was processed. Reload and try again."
                        .to_string(),
                ));
            }
        };
        info!(
            "Interview {id}: recorded round {}/{} (score {})",
            interview.questions.len(),
            self.policy.rounds(),
            evaluation.overall_score
        );

        if self.policy.is_complete(interview.questions.len()) {
            let overall = self.complete(&interview).await?;
            return Ok(SubmitOutcome::completed(evaluation, overall));
        }

        let next_question = self
            .questions
            .generate(&interview.resume_text, &interview.job_role, QuestionContext::Fresh)
            .await?;
        Ok(SubmitOutcome::next(evaluation, next_question))
    }

    // ── Follow-up ───────────────────────────────────────────────────────────

    /// Builds on the last answered round. Read-only.
    pub async fn generate_follow_up(&self, id: Uuid) -> Result<String, AppError> {
        let interview = self.load(id).await?;
        if interview.status.is_terminal() {
            return Err(terminal_error(&interview));
        }

        let context = match interview.last_round() {
            Some(round) => QuestionContext::FollowUp(round),
            None => QuestionContext::Fresh,
        };
        self.questions
            .generate(&interview.resume_text, &interview.job_role, context)
            .await
    }

    // ── Cancel / finalize ───────────────────────────────────────────────────

    /// Idempotent on cancelled interviews. The status write only applies while
    /// the interview is still open, so a concurrent completion wins.
    pub async fn cancel(&self, id: Uuid) -> Result<Interview, AppError> {
        let interview = self.load(id).await?;
        if interview.status.is_terminal() {
            return settle_cancel(interview);
        }

        let previous = interview.status;
        match self
            .store
            .set_status(id, &OPEN_STATUSES, InterviewStatus::Cancelled)
            .await?
        {
            Some(cancelled) => {
                info!("Interview {id}: {previous} -> cancelled");
                Ok(cancelled)
            }
            None => {
                let current = self.load(id).await?;
                warn!("Interview {id}: moved to {} before cancel applied", current.status);
                settle_cancel(current)
            }
        }
    }

    /// Retries the overall evaluation for an interview that holds every round
    /// but is still `in_progress`.
    pub async fn finalize(&self, id: Uuid) -> Result<SubmitOutcome, AppError> {
        let token = self.turn_lock.try_acquire(id).await?.ok_or_else(|| {
            AppError::Conflict("An answer for this interview is still being processed".to_string())
        })?;

        let result = self.finalize_turn(id).await;

        if let Err(e) = self.turn_lock.release(id, token).await {
            warn!("Interview {id}: failed to release turn lock: {e}");
        }
        result
    }

    async fn finalize_turn(&self, id: Uuid) -> Result<SubmitOutcome, AppError> {
        let interview = self.load(id).await?;
        if interview.status.is_terminal() {
            return Err(terminal_error(&interview));
        }
        if !self.policy.is_complete(interview.questions.len()) {
            return Err(AppError::InvalidState(format!(
                "Interview has {} of {} answers; it cannot be finalized yet",
                interview.questions.len(),
                self.policy.rounds()
            )));
        }
        let last_evaluation = interview
            .last_round()
            .map(|r| r.evaluation.clone())
            .ok_or_else(|| AppError::InvalidState("Interview has no answers".to_string()))?;

        let overall = self.complete(&interview).await?;
        Ok(SubmitOutcome::completed(last_evaluation, overall))
    }

    /// Runs the overall evaluation, persists it and archives the report.
    async fn complete(&self, interview: &Interview) -> Result<OverallEvaluation, AppError> {
        let id = interview.id;
        let overall = match self
            .overall_evaluator
            .evaluate_overall(&interview.questions, &interview.job_role)
            .await
        {
            Ok(overall) => overall,
            Err(e) => {
                warn!("Interview {id}: overall evaluation failed, left in_progress for finalize: {e}");
                return Err(e);
            }
        };

        let completed = self.store.complete(id, &overall).await?.ok_or_else(|| {
            AppError::Conflict("Interview was completed or cancelled concurrently".to_string())
        })?;
        info!(
            "Interview {id}: in_progress -> completed ({})",
            overall.hiring_recommendation.decision
        );

        match self.archive.store_report(&completed).await {
            Ok(key) => info!("Interview {id}: report archived at {key}"),
            Err(e) => warn!("Interview {id}: report archive failed: {e:#}"),
        }
        Ok(overall)
    }

    // ── Reads ───────────────────────────────────────────────────────────────

    /// Loads one interview. When `owner_id` is given it must match.
    pub async fn fetch(&self, id: Uuid, owner_id: Option<&str>) -> Result<Interview, AppError> {
        let interview = self.load(id).await?;
        match owner_id {
            Some(owner) if owner != interview.owner_id => Err(AppError::Forbidden),
            _ => Ok(interview),
        }
    }

    /// Newest first.
    pub async fn list_for_owner(&self, owner_id: &str) -> Result<Vec<Interview>, AppError> {
        let owner_id = owner_id.trim();
        if owner_id.is_empty() {
            return Err(AppError::Validation("owner_id is required".to_string()));
        }
        self.store.list_for_owner(owner_id).await
    }

    async fn load(&self, id: Uuid) -> Result<Interview, AppError> {
        self.store
            .find(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Interview {id} not found")))
    }

    fn ensure_accepts_answers(&self, interview: &Interview) -> Result<(), AppError> {
        if interview.status.is_terminal() {
            return Err(terminal_error(interview));
        }
        if self.policy.is_complete(interview.questions.len()) {
            return Err(AppError::InvalidState(format!(
                "Interview already has all {} answers; finalize it instead",
                self.policy.rounds()
            )));
        }
        Ok(())
    }
}

const OPEN_STATUSES: [InterviewStatus; 2] = [InterviewStatus::Pending, InterviewStatus::InProgress];

fn settle_cancel(interview: Interview) -> Result<Interview, AppError> {
    match interview.status {
        InterviewStatus::Cancelled => Ok(interview),
        status => Err(AppError::InvalidState(format!(
            "A {status} interview cannot be cancelled"
        ))),
    }
}

fn terminal_error(interview: &Interview) -> AppError {
    AppError::InvalidState(format!("Interview is {}", interview.status))
}
