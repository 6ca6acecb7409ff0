#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModalId {
    CreateProject,
    EditProject,
    CreateVersion,
    Upload,
    Register,
    ChangePassword,
    AssignProjects,
}

impl ModalId {
    pub fn title(self) -> &'static str {
        match self {
            ModalId::CreateProject => "New Project",
            ModalId::EditProject => "Edit Project",
            ModalId::CreateVersion => "New Version",
            ModalId::Upload => "Upload APK",
            ModalId::Register => "Register User",
            ModalId::ChangePassword => "Change Password",
            ModalId::AssignProjects => "Assign Projects",
        }
    }
}

/// Where a click inside an open modal landed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickTarget {
    Overlay,
    Content,
}

/// Open dialogs in the order they were opened; the last one is on top.
#[derive(Debug, Default)]
pub struct Modals {
    open: Vec<ModalId>,
}

impl Modals {
    /// Opening an already open modal moves it to the top.
    pub fn open(&mut self, id: ModalId) {
        self.open.retain(|x| *x != id);
        self.open.push(id);
    }

    pub fn close(&mut self, id: ModalId) {
        self.open.retain(|x| *x != id);
    }

    pub fn click(&mut self, id: ModalId, target: ClickTarget) {
        if target == ClickTarget::Overlay {
            self.close(id);
        }
    }

    pub fn is_open(&self, id: ModalId) -> bool {
        self.open.contains(&id)
    }

    pub fn top(&self) -> Option<ModalId> {
        self.open.last().copied()
    }
}
