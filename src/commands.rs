//! Line-oriented JSON shell: one command per input line, one reply per output
//! line.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use crate::{
    models::DemographicsForm,
    wizard::{Selection, StudyController, WizardView},
};

const ENABLE_LOGS: bool = true;

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Command {
    Snapshot,
    SubmitDemographics(DemographicsForm),
    DebugSkip,
    NextPage,
    PreviousPage,
    WatchVideo,
    ProceedToSummary,
    MarkSummaryRevealed,
    ProceedToComprehension,
    SubmitComprehension {
        #[serde(default)]
        choice: Option<String>,
    },
    ProceedToContent,
    ShowQuestions,
    #[serde(rename_all = "camelCase")]
    AnswerQuestion {
        question_id: String,
        value: String,
    },
    SubmitRatings,
    SubmitQuizAnswer {
        #[serde(default)]
        selection: Option<Selection>,
    },
    NextQuizQuestion,
    ProceedToStudy,
    RestartQuiz,
    JumpToQuizPart {
        part: usize,
    },
    JumpToStudyPart {
        part: usize,
    },
    JumpToStudyItem {
        part: usize,
        item: usize,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Reply {
    Ok(Box<WizardView>),
    Error(String),
}

impl From<Result<WizardView, String>> for Reply {
    fn from(result: Result<WizardView, String>) -> Self {
        match result {
            Ok(view) => Reply::Ok(Box::new(view)),
            Err(message) => Reply::Error(message),
        }
    }
}

pub async fn dispatch(controller: &StudyController, command: Command) -> Result<WizardView, String> {
    let result = match command {
        Command::Snapshot => controller.snapshot().await,
        Command::SubmitDemographics(form) => controller.submit_demographics(form).await,
        Command::DebugSkip => controller.debug_skip().await,
        Command::NextPage => controller.next_page().await,
        Command::PreviousPage => controller.previous_page().await,
        Command::WatchVideo => controller.watch_video().await,
        Command::ProceedToSummary => controller.proceed_to_summary().await,
        Command::MarkSummaryRevealed => controller.mark_summary_revealed().await,
        Command::ProceedToComprehension => controller.proceed_to_comprehension().await,
        Command::SubmitComprehension { choice } => controller.submit_comprehension(choice).await,
        Command::ProceedToContent => controller.proceed_to_content().await,
        Command::ShowQuestions => controller.show_questions().await,
        Command::AnswerQuestion { question_id, value } => {
            controller.answer_question(question_id, value).await
        }
        Command::SubmitRatings => controller.submit_ratings().await,
        Command::SubmitQuizAnswer { selection } => controller.submit_quiz_answer(selection).await,
        Command::NextQuizQuestion => controller.next_quiz_question().await,
        Command::ProceedToStudy => controller.proceed_to_study().await,
        Command::RestartQuiz => controller.restart_quiz().await,
        Command::JumpToQuizPart { part } => controller.jump_to_quiz_part(part).await,
        Command::JumpToStudyPart { part } => controller.jump_to_study_part(part).await,
        Command::JumpToStudyItem { part, item } => controller.jump_to_study_item(part, item).await,
    };
    result.map_err(|e| e.to_string())
}

pub async fn handle_line(controller: &StudyController, line: &str) -> Reply {
    match serde_json::from_str::<Command>(line) {
        Ok(command) => dispatch(controller, command).await.into(),
        Err(err) => Reply::Error(format!("invalid command: {err}")),
    }
}

/// Serves commands until `input` is exhausted. Blank lines are ignored.
pub async fn run_shell<R, W>(controller: &StudyController, input: R, mut output: W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();
    while let Some(line) = lines.next_line().await.context("failed to read command")? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let reply = handle_line(controller, line).await;
        if let Reply::Error(message) = &reply {
            crate::log_debug!("Command rejected: {message}");
        }
        let mut encoded = serde_json::to_string(&reply).context("failed to encode reply")?;
        encoded.push('\n');
        output
            .write_all(encoded.as_bytes())
            .await
            .context("failed to write reply")?;
        output.flush().await?;
    }
    crate::log_info!("Command input closed");
    Ok(())
}
