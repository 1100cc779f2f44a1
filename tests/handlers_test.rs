//! Integration tests for the Telegram handlers using a mocked Bot API (wiremock)
//!
//! Handlers run against an in-memory database; every Bot API call is answered
//! by the mock server and inspected afterwards.
//!
//! Run with: cargo test --test handlers_test

use serial_test::serial;
use std::ops::ControlFlow;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;
use wiremock::matchers::{method, path_regex};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

use taskbot::config::Mode;
use taskbot::conversation::{FlowKey, FlowState};
use taskbot::storage::attachments::get_attachments;
use taskbot::storage::db::get_all_groups;
use taskbot::storage::tasks::{create_task, get_task, get_task_users, is_user_assigned, NewTask};
use taskbot::storage::users::{get_or_create_user, get_user_by_username};
use taskbot::storage::{create_pool, Task, TaskStatus, User};
use taskbot::telegram::bot::Command;
use taskbot::telegram::handlers::{handle_command, handle_flow_reply, schema};
use taskbot::telegram::menu::{handle_menu_callback, save_incoming_attachment};
use taskbot::telegram::{Bot, HandlerDeps};
use teloxide::prelude::*;
use teloxide::types::{CallbackQuery, Me, Message, MessageId, Update};

const ADMIN_ID: i64 = 111;
const MEMBER_ID: i64 = 222;
const GROUP_CHAT_ID: i64 = -1001234567890;
const BOT_ID: i64 = 987654321;

/// A message as the Bot API returns it for a successful send or edit.
fn bot_message(message_id: i32) -> serde_json::Value {
    serde_json::json!({
        "ok": true,
        "result": {
            "message_id": message_id,
            "from": {"id": BOT_ID, "is_bot": true, "first_name": "Task Bot", "username": "task_bot"},
            "chat": {"id": ADMIN_ID, "type": "private", "first_name": "Admin"},
            "date": 1735992000,
            "text": "ok"
        }
    })
}

/// Answers `sendMessage` with a fresh message id per call, starting at 500.
struct SentMessages {
    next_id: AtomicI32,
}

impl Respond for SentMessages {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        ResponseTemplate::new(200).set_body_json(bot_message(id))
    }
}

fn bot_me() -> Me {
    serde_json::from_value(serde_json::json!({
        "id": BOT_ID,
        "is_bot": true,
        "first_name": "Task Bot",
        "username": "task_bot",
        "can_join_groups": true,
        "can_read_all_group_messages": true,
        "supports_inline_queries": false,
        "can_connect_to_business": false,
        "has_main_web_app": false
    }))
    .expect("Failed to build bot identity")
}

/// Test harness: mock Bot API, real handlers, in-memory database
struct HandlerTest {
    mock_server: MockServer,
    bot: Bot,
    deps: HandlerDeps,
}

impl HandlerTest {
    async fn new(mode: Mode) -> Self {
        let mock_server = MockServer::start().await;
        let bot = teloxide::Bot::new("test_token_12345:ABCDEF").set_api_url(mock_server.uri().parse().unwrap());

        let db_pool = Arc::new(create_pool(":memory:").expect("Failed to create test database"));
        let deps = HandlerDeps::new(db_pool, mode);

        let test = Self { mock_server, bot, deps };
        test.mock_all_telegram_api().await;
        test
    }

    fn user(&self, telegram_id: i64, username: &str, is_admin: bool) -> User {
        let conn = self.deps.db_pool.get().expect("Failed to get connection");
        get_or_create_user(&conn, Some(telegram_id), username, is_admin).expect("Failed to insert user")
    }

    fn task(&self, admin: &User, title: &str) -> Task {
        let conn = self.deps.db_pool.get().expect("Failed to get connection");
        create_task(&conn, &NewTask::new(admin.id, title)).expect("Failed to insert task")
    }

    fn load_task(&self, id: i64) -> Option<Task> {
        let conn = self.deps.db_pool.get().expect("Failed to get connection");
        get_task(&conn, id).expect("Failed to load task")
    }

    fn flow(&self, telegram_id: i64) -> FlowState {
        self.deps
            .flows
            .get(FlowKey::new(ChatId(telegram_id), UserId(telegram_id as u64)))
    }

    /// Answers every Bot API method the handlers use.
    ///
    /// teloxide capitalizes method names in request paths, so every
    /// matcher is case-insensitive.
    async fn mock_all_telegram_api(&self) {
        let message = bot_message(42);
        let ok_true = serde_json::json!({"ok": true, "result": true});

        Mock::given(method("POST"))
            .and(path_regex("(?i)/bot[^/]+/sendMessage$"))
            .respond_with(SentMessages {
                next_id: AtomicI32::new(500),
            })
            .mount(&self.mock_server)
            .await;

        for api_method in ["editMessageText", "editMessageReplyMarkup", "sendDocument", "sendPhoto"] {
            Mock::given(method("POST"))
                .and(path_regex(format!("(?i)/bot[^/]+/{api_method}$")))
                .respond_with(ResponseTemplate::new(200).set_body_json(&message))
                .mount(&self.mock_server)
                .await;
        }

        for api_method in ["answerCallbackQuery", "deleteMessage"] {
            Mock::given(method("POST"))
                .and(path_regex(format!("(?i)/bot[^/]+/{api_method}$")))
                .respond_with(ResponseTemplate::new(200).set_body_json(&ok_true))
                .mount(&self.mock_server)
                .await;
        }

        Mock::given(method("POST"))
            .and(path_regex("(?i)/bot[^/]+/getChatMember$"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "ok": true,
                "result": {
                    "status": "creator",
                    "user": {"id": ADMIN_ID, "is_bot": false, "first_name": "Admin", "username": "boss"},
                    "is_anonymous": false
                }
            })))
            .mount(&self.mock_server)
            .await;

        Mock::given(method("POST"))
            .and(path_regex("(?i)/bot[^/]+/getChatAdministrators$"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true, "result": []})))
            .mount(&self.mock_server)
            .await;
    }

    /// JSON bodies of every call made to `api_method`.
    async fn bodies(&self, api_method: &str) -> Vec<serde_json::Value> {
        let suffix = format!("/{}", api_method.to_lowercase());
        self.mock_server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter(|r| r.url.path().to_lowercase().ends_with(&suffix))
            .filter_map(|r| serde_json::from_slice(&r.body).ok())
            .collect()
    }

    /// Number of calls to `api_method`, whatever their encoding.
    async fn calls(&self, api_method: &str) -> usize {
        let suffix = format!("/{}", api_method.to_lowercase());
        self.mock_server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter(|r| r.url.path().to_lowercase().ends_with(&suffix))
            .count()
    }

    async fn sent_texts(&self) -> Vec<String> {
        self.bodies("sendMessage")
            .await
            .iter()
            .filter_map(|b| b["text"].as_str().map(str::to_string))
            .collect()
    }

    async fn callback_answers(&self) -> Vec<serde_json::Value> {
        self.bodies("answerCallbackQuery").await
    }

    async fn deleted_ids(&self) -> Vec<i32> {
        self.bodies("deleteMessage")
            .await
            .iter()
            .filter_map(|b| b["message_id"].as_i64())
            .filter_map(|id| i32::try_from(id).ok())
            .collect()
    }

    /// Runs `update` through the full dispatcher schema.
    ///
    /// Returns false when no branch took the update.
    async fn dispatch(&self, update: serde_json::Value) -> bool {
        let update: Update = serde_json::from_str(&update.to_string()).expect("Failed to build test update");
        let handler = schema(self.deps.clone());
        match handler.dispatch(dptree::deps![self.bot.clone(), bot_me(), update]).await {
            ControlFlow::Break(result) => {
                result.expect("schema handler failed");
                true
            }
            ControlFlow::Continue(_) => false,
        }
    }

    async fn command(&self, text: &str, from_id: i64, username: &str, cmd: Command) {
        let msg = private_message(text, from_id, username);
        handle_command(self.bot.clone(), msg, cmd, self.deps.clone())
            .await
            .expect("command handler failed");
    }

    async fn reply(&self, text: &str, from_id: i64, username: &str) {
        let msg = private_message(text, from_id, username);
        handle_flow_reply(self.bot.clone(), msg, self.deps.clone())
            .await
            .expect("flow reply handler failed");
    }

    async fn press(&self, data: &str, from_id: i64, username: &str) {
        let q = callback(data, from_id, username);
        handle_menu_callback(self.bot.clone(), q, self.deps.clone())
            .await
            .expect("callback handler failed");
    }
}

fn telegram_user(id: i64, username: &str) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "is_bot": false,
        "first_name": "Test",
        "username": username,
        "language_code": "en"
    })
}

fn private_message(text: &str, from_id: i64, username: &str) -> Message {
    serde_json::from_value(serde_json::json!({
        "message_id": 100,
        "date": 1735992000,
        "chat": {"id": from_id, "type": "private", "first_name": "Test", "username": username},
        "from": telegram_user(from_id, username),
        "text": text
    }))
    .expect("Failed to build test message")
}

fn group_message(text: &str, from_id: i64, username: &str) -> Message {
    serde_json::from_value(serde_json::json!({
        "message_id": 100,
        "date": 1735992000,
        "chat": {"id": GROUP_CHAT_ID, "type": "supergroup", "title": "Team"},
        "from": telegram_user(from_id, username),
        "text": text
    }))
    .expect("Failed to build test message")
}

fn callback(data: &str, from_id: i64, username: &str) -> CallbackQuery {
    serde_json::from_value(serde_json::json!({
        "id": "cb_1",
        "from": telegram_user(from_id, username),
        "chat_instance": "instance",
        "data": data,
        "message": {
            "message_id": 42,
            "date": 1735992000,
            "chat": {"id": from_id, "type": "private", "first_name": "Test"},
            "from": {"id": BOT_ID, "is_bot": true, "first_name": "Task Bot", "username": "task_bot"},
            "text": "menu"
        }
    }))
    .expect("Failed to build test callback")
}

#[tokio::test]
#[serial]
async fn start_in_dev_mode_registers_admin() {
    let test = HandlerTest::new(Mode::Dev).await;

    test.command("/start", ADMIN_ID, "boss", Command::Start).await;

    let conn = test.deps.db_pool.get().unwrap();
    let user = get_user_by_username(&conn, "boss").unwrap().expect("user registered");
    assert!(user.is_admin);
    assert_eq!(user.telegram_id, Some(ADMIN_ID));

    let sent = test.bodies("sendMessage").await;
    assert_eq!(sent.len(), 1);
    assert!(sent[0]["text"].as_str().unwrap().contains("admin"));
    assert!(sent[0]["reply_markup"]["keyboard"].is_array());
}

#[tokio::test]
#[serial]
async fn start_in_prod_mode_rejects_unknown_users() {
    let test = HandlerTest::new(Mode::Prod).await;

    test.command("/start", 555, "stranger", Command::Start).await;

    let conn = test.deps.db_pool.get().unwrap();
    assert!(get_user_by_username(&conn, "stranger").unwrap().is_none());
    let texts = test.sent_texts().await;
    assert!(texts.iter().any(|t| t.contains("account was not found")));
}

#[tokio::test]
#[serial]
async fn start_in_group_registers_the_group() {
    let test = HandlerTest::new(Mode::Dev).await;
    let msg = group_message("/start", ADMIN_ID, "boss");

    handle_command(test.bot.clone(), msg, Command::Start, test.deps.clone())
        .await
        .unwrap();

    let conn = test.deps.db_pool.get().unwrap();
    let groups = get_all_groups(&conn).unwrap();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].telegram_id, GROUP_CHAT_ID);
    assert_eq!(groups[0].name.as_deref(), Some("Team"));
    assert!(test.sent_texts().await.iter().any(|t| t.contains("Team")));
}

#[tokio::test]
#[serial]
async fn tasks_command_lists_tasks_for_admins() {
    let test = HandlerTest::new(Mode::Prod).await;
    let admin = test.user(ADMIN_ID, "boss", true);
    let task = test.task(&admin, "Write docs");

    test.command("/tasks", ADMIN_ID, "boss", Command::Tasks).await;

    let sent = test.bodies("sendMessage").await;
    let keyboard = &sent[0]["reply_markup"]["inline_keyboard"];
    assert_eq!(keyboard[0][0]["callback_data"], format!("task:{}", task.id));
    assert_eq!(keyboard[0][0]["text"], "Write docs");
}

#[tokio::test]
#[serial]
async fn tasks_command_is_refused_to_members() {
    let test = HandlerTest::new(Mode::Prod).await;
    test.user(MEMBER_ID, "worker", false);

    test.command("/tasks", MEMBER_ID, "worker", Command::Tasks).await;

    assert!(test.sent_texts().await.iter().any(|t| t.contains("don't have access")));
}

#[tokio::test]
#[serial]
async fn newtask_with_title_creates_task_and_card() {
    let test = HandlerTest::new(Mode::Prod).await;
    let admin = test.user(ADMIN_ID, "boss", true);

    test.command(
        "/newtask Plan sprint",
        ADMIN_ID,
        "boss",
        Command::NewTask("Plan sprint".to_string()),
    )
    .await;

    let conn = test.deps.db_pool.get().unwrap();
    let tasks = taskbot::storage::tasks::get_tasks_by_admin(&conn, admin.id).unwrap();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].title, "Plan sprint");
    assert_eq!(tasks[0].group_id, None);

    let texts = test.sent_texts().await;
    assert!(texts.iter().any(|t| t.contains("Task Plan sprint created")));
    assert!(texts.iter().any(|t| t.contains("📋 Task: Plan sprint")));
}

#[tokio::test]
#[serial]
async fn bare_newtask_asks_for_the_title() {
    let test = HandlerTest::new(Mode::Prod).await;
    let admin = test.user(ADMIN_ID, "boss", true);

    test.command("/newtask", ADMIN_ID, "boss", Command::NewTask(String::new()))
        .await;
    assert!(matches!(test.flow(ADMIN_ID), FlowState::AwaitingTitle { .. }));

    test.reply("Release notes", ADMIN_ID, "boss").await;

    assert_eq!(test.flow(ADMIN_ID), FlowState::Idle);
    let conn = test.deps.db_pool.get().unwrap();
    let tasks = taskbot::storage::tasks::get_tasks_by_admin(&conn, admin.id).unwrap();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].title, "Release notes");
}

#[tokio::test]
#[serial]
async fn status_button_cycles_status() {
    let test = HandlerTest::new(Mode::Prod).await;
    let admin = test.user(ADMIN_ID, "boss", true);
    let task = test.task(&admin, "Deploy");

    test.press(&format!("status:{}", task.id), ADMIN_ID, "boss").await;

    assert_eq!(test.load_task(task.id).unwrap().status, TaskStatus::InProgress);
    let answers = test.callback_answers().await;
    assert_eq!(answers.len(), 1);
    assert!(answers[0]["text"].as_str().unwrap().contains("in progress"));
}

#[tokio::test]
#[serial]
async fn rename_flow_updates_the_task() {
    let test = HandlerTest::new(Mode::Prod).await;
    let admin = test.user(ADMIN_ID, "boss", true);
    let task = test.task(&admin, "Old name");

    test.press(&format!("edit_name:{}", task.id), ADMIN_ID, "boss").await;
    assert_eq!(
        test.flow(ADMIN_ID),
        FlowState::AwaitingName {
            task_id: task.id,
            prompt: MessageId(42),
            error: None
        }
    );

    test.reply("New name", ADMIN_ID, "boss").await;

    assert_eq!(test.load_task(task.id).unwrap().title, "New name");
    assert_eq!(test.flow(ADMIN_ID), FlowState::Idle);
    let edits = test.bodies("editMessageText").await;
    assert!(edits
        .iter()
        .any(|b| b["text"].as_str().is_some_and(|t| t.contains("Task name changed"))));
}

#[tokio::test]
#[serial]
async fn invalid_date_keeps_the_prompt_open() {
    let test = HandlerTest::new(Mode::Prod).await;
    let admin = test.user(ADMIN_ID, "boss", true);
    let task = test.task(&admin, "Audit");

    test.press(&format!("edit_end:{}", task.id), ADMIN_ID, "boss").await;
    test.reply("next friday", ADMIN_ID, "boss").await;

    let state = test.flow(ADMIN_ID);
    assert!(matches!(state, FlowState::AwaitingEndDate { task_id, .. } if task_id == task.id));
    let error = state.error_message().expect("error message remembered");
    assert!(test.sent_texts().await.iter().any(|t| t.contains("Wrong date format")));

    test.reply("2026-12-31", ADMIN_ID, "boss").await;

    assert!(test.deleted_ids().await.contains(&error.0));

    let end = test.load_task(task.id).unwrap().end_date.expect("end date stored");
    assert_eq!(end.date().to_string(), "2026-12-31");
    assert_eq!(test.flow(ADMIN_ID), FlowState::Idle);
}

#[tokio::test]
#[serial]
async fn cancel_leaves_the_flow() {
    let test = HandlerTest::new(Mode::Prod).await;
    let admin = test.user(ADMIN_ID, "boss", true);
    let task = test.task(&admin, "Audit");

    test.press(&format!("edit_desc:{}", task.id), ADMIN_ID, "boss").await;
    test.command("/cancel", ADMIN_ID, "boss", Command::Cancel).await;

    assert_eq!(test.flow(ADMIN_ID), FlowState::Idle);
    let edits = test.bodies("editMessageText").await;
    let last = edits.last().expect("prompt edited");
    assert!(last["text"].as_str().unwrap().contains("Cancelled"));
    assert_eq!(
        last["reply_markup"]["inline_keyboard"][0][0]["callback_data"],
        format!("task:{}", task.id)
    );
}

#[tokio::test]
#[serial]
async fn members_cannot_use_admin_buttons() {
    let test = HandlerTest::new(Mode::Prod).await;
    let admin = test.user(ADMIN_ID, "boss", true);
    test.user(MEMBER_ID, "worker", false);
    let task = test.task(&admin, "Secret");

    test.press(&format!("del:{}", task.id), MEMBER_ID, "worker").await;

    assert!(test.load_task(task.id).is_some());
    let answers = test.callback_answers().await;
    assert_eq!(answers[0]["show_alert"], true);
    assert!(answers[0]["text"].as_str().unwrap().contains("don't have access"));
}

#[tokio::test]
#[serial]
async fn unregistered_users_are_told_so() {
    let test = HandlerTest::new(Mode::Prod).await;

    test.press("mine", 999, "ghost").await;

    let answers = test.callback_answers().await;
    assert!(answers[0]["text"].as_str().unwrap().contains("account was not found"));
}

#[tokio::test]
#[serial]
async fn delete_button_removes_the_task() {
    let test = HandlerTest::new(Mode::Prod).await;
    let admin = test.user(ADMIN_ID, "boss", true);
    let task = test.task(&admin, "Obsolete");

    test.press(&format!("del:{}", task.id), ADMIN_ID, "boss").await;

    assert!(test.load_task(task.id).is_none());
    let answers = test.callback_answers().await;
    assert!(answers[0]["text"].as_str().unwrap().contains("Obsolete"));
}

#[tokio::test]
#[serial]
async fn manual_username_assigns_a_new_user() {
    let test = HandlerTest::new(Mode::Prod).await;
    let admin = test.user(ADMIN_ID, "boss", true);
    let task = test.task(&admin, "Pair up");

    test.press(&format!("manual:{}", task.id), ADMIN_ID, "boss").await;
    assert!(matches!(test.flow(ADMIN_ID), FlowState::AwaitingUsername { .. }));

    test.reply("@new_member", ADMIN_ID, "boss").await;

    let conn = test.deps.db_pool.get().unwrap();
    let user = get_user_by_username(&conn, "new_member").unwrap().expect("user created");
    assert_eq!(user.telegram_id, None);
    assert!(!user.is_admin);
    assert!(is_user_assigned(&conn, user.id, task.id).unwrap());
    assert_eq!(test.flow(ADMIN_ID), FlowState::Idle);
}

#[tokio::test]
#[serial]
async fn remove_user_requires_confirmation() {
    let test = HandlerTest::new(Mode::Prod).await;
    let admin = test.user(ADMIN_ID, "boss", true);
    let member = test.user(MEMBER_ID, "worker", false);
    let task = test.task(&admin, "Shared");
    {
        let conn = test.deps.db_pool.get().unwrap();
        taskbot::storage::tasks::assign_user_to_task(&conn, member.id, task.id).unwrap();
    }

    test.press(&format!("rm:{}:{}", task.id, member.id), ADMIN_ID, "boss")
        .await;
    {
        let conn = test.deps.db_pool.get().unwrap();
        assert!(is_user_assigned(&conn, member.id, task.id).unwrap());
    }

    test.press(&format!("rm_ok:{}:{}", task.id, member.id), ADMIN_ID, "boss")
        .await;
    let conn = test.deps.db_pool.get().unwrap();
    assert!(get_task_users(&conn, task.id).unwrap().is_empty());
}

#[tokio::test]
#[serial]
async fn members_see_their_assigned_tasks() {
    let test = HandlerTest::new(Mode::Prod).await;
    let admin = test.user(ADMIN_ID, "boss", true);
    let member = test.user(MEMBER_ID, "worker", false);
    let mine = test.task(&admin, "Mine");
    test.task(&admin, "Not mine");
    {
        let conn = test.deps.db_pool.get().unwrap();
        taskbot::storage::tasks::assign_user_to_task(&conn, member.id, mine.id).unwrap();
    }

    test.command("/mytasks", MEMBER_ID, "worker", Command::MyTasks).await;

    let sent = test.bodies("sendMessage").await;
    let keyboard = sent[0]["reply_markup"]["inline_keyboard"].as_array().unwrap();
    let callbacks: Vec<&str> = keyboard
        .iter()
        .filter_map(|row| row.as_array())
        .flatten()
        .filter_map(|button| button["callback_data"].as_str())
        .collect();
    assert!(callbacks.contains(&format!("show:{}", mine.id).as_str()));
    assert_eq!(callbacks.iter().filter(|c| c.starts_with("show:")).count(), 1);
}

#[tokio::test]
#[serial]
async fn members_cannot_open_foreign_tasks() {
    let test = HandlerTest::new(Mode::Prod).await;
    let admin = test.user(ADMIN_ID, "boss", true);
    test.user(MEMBER_ID, "worker", false);
    let task = test.task(&admin, "Private");

    test.press(&format!("show:{}", task.id), MEMBER_ID, "worker").await;

    let answers = test.callback_answers().await;
    assert_eq!(answers[0]["show_alert"], true);
    assert!(test.bodies("editMessageText").await.is_empty());
}

#[tokio::test]
#[serial]
async fn attachments_are_collected_and_sent_back() {
    let test = HandlerTest::new(Mode::Prod).await;
    let admin = test.user(ADMIN_ID, "boss", true);
    let task = test.task(&admin, "Design");

    test.press(&format!("files:{}", task.id), ADMIN_ID, "boss").await;
    let answers = test.callback_answers().await;
    assert!(answers[0]["text"].as_str().unwrap().contains("no attachments"));

    test.press(&format!("attach:{}", task.id), ADMIN_ID, "boss").await;
    let key = FlowKey::new(ChatId(ADMIN_ID), UserId(ADMIN_ID as u64));
    assert_eq!(test.deps.flows.collecting_for(key), Some(task.id));

    let document: Message = serde_json::from_value(serde_json::json!({
        "message_id": 101,
        "date": 1735992000,
        "chat": {"id": ADMIN_ID, "type": "private", "first_name": "Test"},
        "from": telegram_user(ADMIN_ID, "boss"),
        "document": {"file_id": "DOC_1", "file_unique_id": "U_DOC_1", "file_size": 10}
    }))
    .unwrap();
    let saved = save_incoming_attachment(&test.bot, &document, &test.deps, key, task.id)
        .await
        .unwrap();
    assert!(saved);
    {
        let conn = test.deps.db_pool.get().unwrap();
        assert_eq!(get_attachments(&conn, task.id).unwrap().len(), 1);
    }

    test.press(&format!("files:{}", task.id), ADMIN_ID, "boss").await;
    assert_eq!(test.calls("sendDocument").await, 1);
}

#[tokio::test]
#[serial]
async fn deluser_removes_the_user() {
    let test = HandlerTest::new(Mode::Prod).await;
    test.user(ADMIN_ID, "boss", true);
    test.user(MEMBER_ID, "worker", false);

    test.command(
        "/deluser worker",
        ADMIN_ID,
        "boss",
        Command::DelUser("worker".to_string()),
    )
    .await;

    let conn = test.deps.db_pool.get().unwrap();
    assert!(get_user_by_username(&conn, "worker").unwrap().is_none());
    assert!(test.sent_texts().await.iter().any(|t| t.contains("User deleted")));
}

/// Sends `bad` twice then `good`, checking that only the newest error stays visible.
async fn errors_replace_each_other(test: &HandlerTest, bad: &str, good: &str) {
    test.reply(bad, ADMIN_ID, "boss").await;
    let first = test.flow(ADMIN_ID).error_message().expect("first error remembered");

    test.reply(bad, ADMIN_ID, "boss").await;
    let second = test.flow(ADMIN_ID).error_message().expect("second error remembered");
    assert_ne!(first, second);
    let deleted = test.deleted_ids().await;
    assert!(deleted.contains(&first.0), "first error {first:?} not deleted after {bad:?}");
    assert!(!deleted.contains(&second.0));

    test.reply(good, ADMIN_ID, "boss").await;
    assert_eq!(test.flow(ADMIN_ID), FlowState::Idle);
    assert!(
        test.deleted_ids().await.contains(&second.0),
        "last error {second:?} left behind after {good:?}"
    );
}

#[tokio::test]
#[serial]
async fn every_prompt_keeps_only_the_newest_error() {
    let test = HandlerTest::new(Mode::Prod).await;
    let admin = test.user(ADMIN_ID, "boss", true);
    let task = test.task(&admin, "Errors");

    test.command("/newtask", ADMIN_ID, "boss", Command::NewTask(String::new()))
        .await;
    errors_replace_each_other(&test, "   ", "Release").await;

    for (button, bad, good) in [
        ("edit_name", "   ", "New name"),
        ("edit_desc", "   ", "Desc"),
        ("edit_start", "soon", "2026-01-01"),
        ("edit_end", "soon", "2026-12-31"),
        ("manual", "bad name", "@helper"),
    ] {
        test.press(&format!("{button}:{}", task.id), ADMIN_ID, "boss").await;
        assert!(test.flow(ADMIN_ID).expects_text(), "{button} opened no prompt");
        errors_replace_each_other(&test, bad, good).await;
    }

    let task = test.load_task(task.id).unwrap();
    assert_eq!(task.title, "New name");
    assert_eq!(task.description.as_deref(), Some("Desc"));
}

#[tokio::test]
#[serial]
async fn group_start_is_refused_to_registered_members() {
    let test = HandlerTest::new(Mode::Prod).await;
    test.user(MEMBER_ID, "worker", false);
    let msg = group_message("/start", MEMBER_ID, "worker");

    handle_command(test.bot.clone(), msg, Command::Start, test.deps.clone())
        .await
        .unwrap();

    let conn = test.deps.db_pool.get().unwrap();
    assert!(get_all_groups(&conn).unwrap().is_empty());
    assert!(test.sent_texts().await.iter().any(|t| t.contains("don't have access")));
}

#[tokio::test]
#[serial]
async fn picking_a_user_for_a_deleted_task_reports_the_task() {
    let test = HandlerTest::new(Mode::Prod).await;
    test.user(ADMIN_ID, "boss", true);
    let member = test.user(MEMBER_ID, "worker", false);

    test.press(&format!("pick:9999:{}", member.id), ADMIN_ID, "boss")
        .await;
    test.press(&format!("rm_ok:9999:{}", member.id), ADMIN_ID, "boss")
        .await;

    let answers = test.callback_answers().await;
    assert_eq!(answers.len(), 2);
    for answer in &answers {
        assert_eq!(answer["show_alert"], true);
        assert!(answer["text"].as_str().unwrap().contains("This task doesn't exist"));
    }
}

#[tokio::test]
#[serial]
async fn menu_label_wins_over_an_open_prompt() {
    let test = HandlerTest::new(Mode::Prod).await;
    let admin = test.user(ADMIN_ID, "boss", true);
    let task = test.task(&admin, "Keep me");
    test.press(&format!("edit_name:{}", task.id), ADMIN_ID, "boss").await;

    let update = serde_json::json!({
        "update_id": 1,
        "message": private_message("➕ New task", ADMIN_ID, "boss")
    });
    assert!(test.dispatch(update).await);

    assert!(matches!(test.flow(ADMIN_ID), FlowState::AwaitingTitle { .. }));
    assert_eq!(test.load_task(task.id).unwrap().title, "Keep me");
}

#[tokio::test]
#[serial]
async fn commands_win_over_an_open_prompt() {
    let test = HandlerTest::new(Mode::Prod).await;
    let admin = test.user(ADMIN_ID, "boss", true);
    let task = test.task(&admin, "Keep me");
    test.press(&format!("edit_name:{}", task.id), ADMIN_ID, "boss").await;

    let update = serde_json::json!({
        "update_id": 1,
        "message": private_message("/cancel", ADMIN_ID, "boss")
    });
    assert!(test.dispatch(update).await);

    assert_eq!(test.flow(ADMIN_ID), FlowState::Idle);
    assert_eq!(test.load_task(task.id).unwrap().title, "Keep me");
}

#[tokio::test]
#[serial]
async fn collecting_attachments_ignores_text_and_stores_files() {
    let test = HandlerTest::new(Mode::Prod).await;
    let admin = test.user(ADMIN_ID, "boss", true);
    let task = test.task(&admin, "Design");
    test.press(&format!("attach:{}", task.id), ADMIN_ID, "boss").await;

    let text = serde_json::json!({
        "update_id": 1,
        "message": private_message("just chatting", ADMIN_ID, "boss")
    });
    assert!(!test.dispatch(text).await);
    assert!(test.sent_texts().await.is_empty());

    let document = serde_json::json!({
        "update_id": 2,
        "message": {
            "message_id": 101,
            "date": 1735992000,
            "chat": {"id": ADMIN_ID, "type": "private", "first_name": "Test"},
            "from": telegram_user(ADMIN_ID, "boss"),
            "document": {"file_id": "DOC_1", "file_unique_id": "U_DOC_1", "file_size": 10}
        }
    });
    assert!(test.dispatch(document).await);

    let conn = test.deps.db_pool.get().unwrap();
    assert_eq!(get_attachments(&conn, task.id).unwrap().len(), 1);
    assert!(test.sent_texts().await.iter().any(|t| t.contains("File attached")));
}

#[tokio::test]
#[serial]
async fn callback_updates_are_answered() {
    let test = HandlerTest::new(Mode::Prod).await;
    let admin = test.user(ADMIN_ID, "boss", true);
    let task = test.task(&admin, "Deploy");

    let update = serde_json::json!({
        "update_id": 1,
        "callback_query": callback(&format!("status:{}", task.id), ADMIN_ID, "boss")
    });
    assert!(test.dispatch(update).await);

    assert_eq!(test.callback_answers().await.len(), 1);
    assert_eq!(test.load_task(task.id).unwrap().status, TaskStatus::InProgress);
}
