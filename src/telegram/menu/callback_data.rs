//! Typed inline-button payloads.
//!
//! Every button carries `prefix[:arg[:arg]]`. Ids travel in the payload so a
//! press can be served without any stored conversation state.

use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackData {
    /// Task management menu (`tm:back`)
    ManageMenu,
    /// Removes the menu message (`tm:close`)
    CloseMenu,
    /// Tasks the pressing admin created (`tm:own`)
    OwnTasks,
    ViewGroup(i64),
    /// Tasks created outside group chats (`grp:other`)
    ViewUngrouped,
    /// Tasks assigned to the pressing user
    MyTasks,
    /// Admin card with every action
    AdminTask(i64),
    /// Read-only card for assignees
    ShowTask(i64),
    DeleteTask(i64),
    CycleStatus(i64),
    AddUser(i64),
    PickUser { task_id: i64, user_id: i64 },
    ManualUsername(i64),
    TaskUsers(i64),
    RemoveList(i64),
    RemoveUser { task_id: i64, user_id: i64 },
    ConfirmRemove { task_id: i64, user_id: i64 },
    EditName(i64),
    EditDescription(i64),
    EditStart(i64),
    EditEnd(i64),
    AddAttachment(i64),
    GetAttachments(i64),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownCallback(pub String);

impl fmt::Display for UnknownCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown callback data: {}", self.0)
    }
}

impl std::error::Error for UnknownCallback {}

impl fmt::Display for CallbackData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use CallbackData::*;
        match self {
            ManageMenu => f.write_str("tm:back"),
            CloseMenu => f.write_str("tm:close"),
            OwnTasks => f.write_str("tm:own"),
            ViewGroup(id) => write!(f, "grp:{id}"),
            ViewUngrouped => f.write_str("grp:other"),
            MyTasks => f.write_str("mine"),
            AdminTask(id) => write!(f, "task:{id}"),
            ShowTask(id) => write!(f, "show:{id}"),
            DeleteTask(id) => write!(f, "del:{id}"),
            CycleStatus(id) => write!(f, "status:{id}"),
            AddUser(id) => write!(f, "add_user:{id}"),
            PickUser { task_id, user_id } => write!(f, "pick:{task_id}:{user_id}"),
            ManualUsername(id) => write!(f, "manual:{id}"),
            TaskUsers(id) => write!(f, "users:{id}"),
            RemoveList(id) => write!(f, "rm_list:{id}"),
            RemoveUser { task_id, user_id } => write!(f, "rm:{task_id}:{user_id}"),
            ConfirmRemove { task_id, user_id } => write!(f, "rm_ok:{task_id}:{user_id}"),
            EditName(id) => write!(f, "edit_name:{id}"),
            EditDescription(id) => write!(f, "edit_desc:{id}"),
            EditStart(id) => write!(f, "edit_start:{id}"),
            EditEnd(id) => write!(f, "edit_end:{id}"),
            AddAttachment(id) => write!(f, "attach:{id}"),
            GetAttachments(id) => write!(f, "files:{id}"),
        }
    }
}

impl FromStr for CallbackData {
    type Err = UnknownCallback;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        use CallbackData::*;
        let unknown = || UnknownCallback(data.to_string());

        let mut parts = data.split(':');
        let prefix = parts.next().unwrap_or_default();
        let args: Vec<&str> = parts.collect();
        let id = |index: usize| -> Result<i64, UnknownCallback> {
            args.get(index).and_then(|v| v.parse().ok()).ok_or_else(unknown)
        };
        let pair = || -> Result<(i64, i64), UnknownCallback> {
            if args.len() != 2 {
                return Err(unknown());
            }
            Ok((id(0)?, id(1)?))
        };
        let single = || -> Result<i64, UnknownCallback> {
            if args.len() != 1 {
                return Err(unknown());
            }
            id(0)
        };

        match (prefix, args.as_slice()) {
            ("tm", ["back"]) => Ok(ManageMenu),
            ("tm", ["close"]) => Ok(CloseMenu),
            ("tm", ["own"]) => Ok(OwnTasks),
            ("grp", ["other"]) => Ok(ViewUngrouped),
            ("grp", _) => single().map(ViewGroup),
            ("mine", []) => Ok(MyTasks),
            ("task", _) => single().map(AdminTask),
            ("show", _) => single().map(ShowTask),
            ("del", _) => single().map(DeleteTask),
            ("status", _) => single().map(CycleStatus),
            ("add_user", _) => single().map(AddUser),
            ("pick", _) => pair().map(|(task_id, user_id)| PickUser { task_id, user_id }),
            ("manual", _) => single().map(ManualUsername),
            ("users", _) => single().map(TaskUsers),
            ("rm_list", _) => single().map(RemoveList),
            ("rm", _) => pair().map(|(task_id, user_id)| RemoveUser { task_id, user_id }),
            ("rm_ok", _) => pair().map(|(task_id, user_id)| ConfirmRemove { task_id, user_id }),
            ("edit_name", _) => single().map(EditName),
            ("edit_desc", _) => single().map(EditDescription),
            ("edit_start", _) => single().map(EditStart),
            ("edit_end", _) => single().map(EditEnd),
            ("attach", _) => single().map(AddAttachment),
            ("files", _) => single().map(GetAttachments),
            _ => Err(unknown()),
        }
    }
}

impl CallbackData {
    /// Actions any registered user may trigger. Everything else needs an admin.
    pub fn is_member_action(&self) -> bool {
        matches!(
            self,
            CallbackData::CloseMenu | CallbackData::MyTasks | CallbackData::ShowTask(_) | CallbackData::GetAttachments(_)
        )
    }
}
