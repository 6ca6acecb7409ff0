use apkman_core::{
    api::{FileId, ProjectId, VersionId},
    models::{files::ApkFile, projects::Project, versions::Version},
};

use super::Listing;

/// Projects → versions → files, keyed by id.
///
/// Children are fetched lazily when a node expands and stay in place when it
/// collapses, until the whole tree is reloaded.
#[derive(Debug, Default)]
pub struct ProjectTree {
    pub projects: Listing<ProjectNode>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProjectNode {
    pub project: Project,
    pub expanded: bool,
    pub versions: Listing<VersionNode>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VersionNode {
    pub version: Version,
    pub expanded: bool,
    pub files: Listing<ApkFile>,
}

impl ProjectTree {
    pub fn set_loading(&mut self) {
        self.projects = Listing::Loading;
    }

    /// Replaces the whole tree; every node starts collapsed.
    pub fn set_projects<E: std::fmt::Display>(&mut self, result: Result<Vec<Project>, E>) {
        self.projects = Listing::from_result(result.map(|projects| {
            projects
                .into_iter()
                .map(|project| ProjectNode {
                    project,
                    expanded: false,
                    versions: Listing::Loading,
                })
                .collect()
        }));
    }

    pub fn project(&self, id: ProjectId) -> Option<&ProjectNode> {
        self.projects.items().iter().find(|x| x.project.id == id)
    }

    fn project_mut(&mut self, id: ProjectId) -> Option<&mut ProjectNode> {
        self.projects
            .items_mut()?
            .iter_mut()
            .find(|x| x.project.id == id)
    }

    pub fn version(&self, id: VersionId) -> Option<&VersionNode> {
        self.projects
            .items()
            .iter()
            .flat_map(|x| x.versions.items().iter())
            .find(|x| x.version.id == id)
    }

    fn version_mut(&mut self, id: VersionId) -> Option<&mut VersionNode> {
        self.projects
            .items_mut()?
            .iter_mut()
            .filter_map(|x| x.versions.items_mut())
            .flat_map(|x| x.iter_mut())
            .find(|x| x.version.id == id)
    }

    /// Flips a project's expansion. Returns `Some(true)` when it is now
    /// expanded and its versions should be fetched, `None` if unknown.
    pub fn toggle_project(&mut self, id: ProjectId) -> Option<bool> {
        let node = self.project_mut(id)?;
        node.expanded = !node.expanded;
        Some(node.expanded)
    }

    pub fn toggle_version(&mut self, id: VersionId) -> Option<bool> {
        let node = self.version_mut(id)?;
        node.expanded = !node.expanded;
        Some(node.expanded)
    }

    pub fn is_project_expanded(&self, id: ProjectId) -> bool {
        self.project(id).map(|x| x.expanded).unwrap_or(false)
    }

    pub fn is_version_expanded(&self, id: VersionId) -> bool {
        self.version(id).map(|x| x.expanded).unwrap_or(false)
    }

    pub fn set_versions<E: std::fmt::Display>(&mut self, project: ProjectId, result: Result<Vec<Version>, E>) {
        if let Some(node) = self.project_mut(project) {
            node.versions = Listing::from_result(result.map(|versions| {
                versions
                    .into_iter()
                    .map(|version| VersionNode {
                        version,
                        expanded: false,
                        files: Listing::Loading,
                    })
                    .collect()
            }));
        }
    }

    pub fn set_files<E: std::fmt::Display>(&mut self, version: VersionId, result: Result<Vec<ApkFile>, E>) {
        if let Some(node) = self.version_mut(version) {
            node.files = Listing::from_result(result);
        }
    }

    pub fn remove_project(&mut self, id: ProjectId) -> bool {
        match self.projects.items_mut() {
            Some(projects) => {
                let before = projects.len();
                projects.retain(|x| x.project.id != id);
                projects.len() != before
            }
            None => false,
        }
    }

    pub fn remove_file(&mut self, id: FileId) -> bool {
        let Some(projects) = self.projects.items_mut() else {
            return false;
        };
        for files in projects
            .iter_mut()
            .filter_map(|x| x.versions.items_mut())
            .flat_map(|x| x.iter_mut())
            .filter_map(|x| x.files.items_mut())
        {
            let before = files.len();
            files.retain(|x| x.id != id);
            if files.len() != before {
                return true;
            }
        }
        false
    }

    pub fn contains_file(&self, id: FileId) -> bool {
        self.projects
            .items()
            .iter()
            .flat_map(|x| x.versions.items().iter())
            .flat_map(|x| x.files.items().iter())
            .any(|x| x.id == id)
    }
}
