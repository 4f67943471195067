#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskId(pub u64);

#[derive(Debug, Default)]
pub struct TaskSeq {
    next: u64,
}

impl TaskSeq {
    pub fn next_id(&mut self) -> TaskId {
        let id = TaskId(self.next);
        self.next = self.next.wrapping_add(1);
        id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskKind {
    Login,
    Register,
    Logout,
    CreatePost,
    UpdatePost,
    DeletePost,
    RefreshFeed,
}

#[derive(Debug, Clone)]
pub struct TaskStarted {
    pub id: TaskId,
}

#[derive(Debug)]
pub struct TaskCompleted<E> {
    pub id: TaskId,
    pub result: E,
}

/// Task lifecycle state (stored in AppState, mutated only by reducer).
#[derive(Debug, Default, Clone)]
pub struct TaskState {
    pub active: Option<TaskId>,
}

impl TaskState {
    pub fn is_running(&self) -> bool {
        self.active.is_some()
    }

    pub fn on_started(&mut self, started: &TaskStarted) {
        self.active = Some(started.id);
    }

    pub fn finish_if_active(&mut self, id: TaskId) -> bool {
        let ok = self.active == Some(id);
        if ok {
            self.active = None;
        }
        ok
    }
}

#[derive(Debug, Default, Clone)]
pub struct Tasks {
    pub login: TaskState,
    pub register: TaskState,
    pub logout: TaskState,
    pub create_post: TaskState,
    pub update_post: TaskState,
    pub delete_post: TaskState,
    pub refresh_feed: TaskState,
}

impl Tasks {
    pub fn state(&self, kind: TaskKind) -> &TaskState {
        match kind {
            TaskKind::Login => &self.login,
            TaskKind::Register => &self.register,
            TaskKind::Logout => &self.logout,
            TaskKind::CreatePost => &self.create_post,
            TaskKind::UpdatePost => &self.update_post,
            TaskKind::DeletePost => &self.delete_post,
            TaskKind::RefreshFeed => &self.refresh_feed,
        }
    }

    pub fn state_mut(&mut self, kind: TaskKind) -> &mut TaskState {
        match kind {
            TaskKind::Login => &mut self.login,
            TaskKind::Register => &mut self.register,
            TaskKind::Logout => &mut self.logout,
            TaskKind::CreatePost => &mut self.create_post,
            TaskKind::UpdatePost => &mut self.update_post,
            TaskKind::DeletePost => &mut self.delete_post,
            TaskKind::RefreshFeed => &mut self.refresh_feed,
        }
    }

    pub fn is_any_running(&self) -> bool {
        self.login.is_running()
            || self.register.is_running()
            || self.logout.is_running()
            || self.create_post.is_running()
            || self.update_post.is_running()
            || self.delete_post.is_running()
            || self.refresh_feed.is_running()
    }
}
