//! Navigation sections and layout state.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Section {
    Home,
    Projects,
    Tasks,
    Sprints,
    Statistics,
    TeamMembers,
}

impl Section {
    pub fn title(&self) -> &'static str {
        match self {
            Section::Home => "Home",
            Section::Projects => "Projects",
            Section::Tasks => "Tasks",
            Section::Sprints => "Sprints",
            Section::Statistics => "Statistics",
            Section::TeamMembers => "Team Members",
        }
    }

    pub fn path(&self) -> &'static str {
        match self {
            Section::Home => "/",
            Section::Projects => "/projects",
            Section::Tasks => "/tasks",
            Section::Sprints => "/sprints",
            Section::Statistics => "/statistics",
            Section::TeamMembers => "/team-members",
        }
    }

    /// Section owning a route. Nested routes such as `/projects/3` resolve to
    /// their top-level section.
    pub fn from_path(path: &str) -> Option<Section> {
        let first = path.trim_start_matches('/').split('/').next().unwrap_or("");
        Self::all()
            .iter()
            .copied()
            .find(|section| section.path().trim_start_matches('/') == first)
    }

    pub fn all() -> &'static [Section] {
        &[
            Section::Home,
            Section::Projects,
            Section::Tasks,
            Section::Sprints,
            Section::Statistics,
            Section::TeamMembers,
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Breadcrumb {
    pub title: &'static str,
    pub path: &'static str,
}

impl From<Section> for Breadcrumb {
    fn from(section: Section) -> Self {
        Self {
            title: section.title(),
            path: section.path(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LayoutState {
    pub collapsed: bool,
    pub breadcrumbs: Vec<Breadcrumb>,
}

impl LayoutState {
    pub fn toggle_collapse(&mut self) {
        self.collapsed = !self.collapsed;
    }

    /// Home, followed by `section` unless it is Home itself.
    pub fn update_breadcrumbs(&mut self, section: Section) {
        let mut crumbs = vec![Breadcrumb::from(Section::Home)];
        if section != Section::Home {
            crumbs.push(Breadcrumb::from(section));
        }
        self.breadcrumbs = crumbs;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_path_resolves_nested_routes() {
        assert_eq!(Section::from_path("/"), Some(Section::Home));
        assert_eq!(Section::from_path("/projects/3"), Some(Section::Projects));
        assert_eq!(Section::from_path("/team-members"), Some(Section::TeamMembers));
        assert_eq!(Section::from_path("/login"), None);
    }

    #[test]
    fn test_breadcrumbs() {
        let mut layout = LayoutState::default();
        layout.update_breadcrumbs(Section::Sprints);
        let titles: Vec<&str> = layout.breadcrumbs.iter().map(|c| c.title).collect();
        assert_eq!(titles, vec!["Home", "Sprints"]);

        layout.update_breadcrumbs(Section::Home);
        assert_eq!(layout.breadcrumbs.len(), 1);
    }

    #[test]
    fn test_toggle_collapse() {
        let mut layout = LayoutState::default();
        layout.toggle_collapse();
        assert!(layout.collapsed);
        layout.toggle_collapse();
        assert!(!layout.collapsed);
    }
}
