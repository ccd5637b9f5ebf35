// Interview pipeline: resume → questions → recorded answers → evaluations → verdict.
// `session` owns the state machine; everything else is a collaborator behind a trait.
pub mod answer_evaluator;
pub mod archive;
pub mod handlers;
pub mod lock;
pub mod overall_evaluator;
pub mod owners;
pub mod parsing;
pub mod prompts;
pub mod question_generator;
pub mod session;
pub mod store;

#[cfg(test)]
pub mod testing;
