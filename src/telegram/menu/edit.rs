//! Prompts for editing a single task field.

use teloxide::types::MessageId;

use super::{keyboards, render, views, Answer, CallbackCtx};
use crate::conversation::{parse_date, validate_description, validate_title, FlowState, InputError};
use crate::storage::tasks::{get_task, TaskEdit};
use crate::storage::with_conn;
use crate::telegram::handlers::{HandlerDeps, HandlerError};
use crate::telegram::Bot;

/// A task field edited through a prompt and a single reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditField {
    Name,
    Description,
    StartDate,
    EndDate,
}

impl EditField {
    fn prompt_key(self) -> &'static str {
        match self {
            EditField::Name => "prompt-name",
            EditField::Description => "prompt-description",
            EditField::StartDate => "prompt-start-date",
            EditField::EndDate => "prompt-end-date",
        }
    }

    /// Message shown once the edit is stored.
    pub fn done_key(self) -> &'static str {
        match self {
            EditField::Name => "edit-name-done",
            EditField::Description => "edit-description-done",
            EditField::StartDate => "edit-start-done",
            EditField::EndDate => "edit-end-done",
        }
    }

    fn awaiting(self, task_id: i64, prompt: MessageId) -> FlowState {
        match self {
            EditField::Name => FlowState::AwaitingName {
                task_id,
                prompt,
                error: None,
            },
            EditField::Description => FlowState::AwaitingDescription {
                task_id,
                prompt,
                error: None,
            },
            EditField::StartDate => FlowState::AwaitingStartDate {
                task_id,
                prompt,
                error: None,
            },
            EditField::EndDate => FlowState::AwaitingEndDate {
                task_id,
                prompt,
                error: None,
            },
        }
    }

    /// The field a flow state is waiting for, with its task.
    pub fn from_state(state: &FlowState) -> Option<(Self, i64)> {
        match *state {
            FlowState::AwaitingName { task_id, .. } => Some((EditField::Name, task_id)),
            FlowState::AwaitingDescription { task_id, .. } => Some((EditField::Description, task_id)),
            FlowState::AwaitingStartDate { task_id, .. } => Some((EditField::StartDate, task_id)),
            FlowState::AwaitingEndDate { task_id, .. } => Some((EditField::EndDate, task_id)),
            _ => None,
        }
    }

    /// Validates a reply into the change it describes.
    pub fn parse(self, text: &str) -> Result<TaskEdit, InputError> {
        match self {
            EditField::Name => validate_title(text).map(TaskEdit::title),
            EditField::Description => validate_description(text).map(TaskEdit::description),
            EditField::StartDate => parse_date(text).map(TaskEdit::start_date),
            EditField::EndDate => parse_date(text).map(TaskEdit::end_date),
        }
    }
}

/// Turns the card into a prompt and waits for the reply.
pub async fn start_edit(
    bot: &Bot,
    ctx: &CallbackCtx,
    deps: &HandlerDeps,
    task_id: i64,
    field: EditField,
) -> Result<Answer, HandlerError> {
    let Some(task) = with_conn(&deps.db_pool, |conn| get_task(conn, task_id))? else {
        return Ok(Answer::Alert(ctx.t("error-task-not-found")));
    };

    let text = views::prompt_text(&ctx.lang, field.prompt_key(), &task.title);
    let prompt = render(bot, ctx.edit(), text, keyboards::back_to_task_keyboard(&ctx.lang, task_id)).await?;
    deps.flows.set(ctx.flow_key(), field.awaiting(task_id, prompt));
    Ok(Answer::Silent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn state_round_trips_through_field() {
        let prompt = MessageId(10);
        for field in [EditField::Name, EditField::Description, EditField::StartDate, EditField::EndDate] {
            let state = field.awaiting(4, prompt);
            assert_eq!(EditField::from_state(&state), Some((field, 4)));
            assert_eq!(state.prompt(), Some(prompt));
        }
        let username = FlowState::AwaitingUsername {
            task_id: 4,
            prompt,
            error: None,
        };
        assert_eq!(EditField::from_state(&username), None);
    }

    #[test]
    fn replies_are_validated_per_field() {
        let edit = EditField::EndDate.parse("2025-03-01").unwrap();
        assert_eq!(edit.end_date, NaiveDate::from_ymd_opt(2025, 3, 1));
        assert!(edit.title.is_none());

        assert_eq!(EditField::StartDate.parse("01/03/2025").unwrap_err(), InputError::InvalidDate);
        assert_eq!(EditField::Name.parse("   ").unwrap_err(), InputError::Empty);
        assert_eq!(EditField::Description.parse(" notes ").unwrap().description.as_deref(), Some("notes"));
    }
}
