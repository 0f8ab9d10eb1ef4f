use chrono::{DateTime, Local};

use crate::history::{ProjectGroups, SessionRecord};
use crate::util::{format_clock, format_timestamp};

pub const NO_ACTIVE_SESSIONS: &str = "No active sessions today.";
const NO_PROMPTS: &str = "(none)";

/// Renders the workspace activity note.
///
/// Projects are listed by path, case-insensitively. Sessions keep the order
/// they arrive in, which the scanner leaves newest first.
pub fn render_markdown(groups: &ProjectGroups, generated_at: DateTime<Local>) -> String {
    let mut lines = vec![
        "# Workspace Activity".to_string(),
        String::new(),
        format!("*Last updated: {}*", format_timestamp(generated_at)),
        String::new(),
    ];

    if groups.is_empty() {
        lines.push(NO_ACTIVE_SESSIONS.to_string());
        return lines.join("\n");
    }

    let mut projects: Vec<(&String, &Vec<SessionRecord>)> = groups.iter().collect();
    projects.sort_by(|(a, _), (b, _)| {
        a.to_lowercase()
            .cmp(&b.to_lowercase())
            .then_with(|| a.cmp(b))
    });

    for (project_path, sessions) in projects {
        lines.push("---".to_string());
        lines.push(String::new());
        lines.push(format!("## {project_path}"));

        for session in sessions {
            lines.push(format!(
                "**Last updated**: {}",
                format_clock(session.last_updated)
            ));
            lines.push("**Prompts**:".to_string());
            if session.prompts.is_empty() {
                lines.push(format!("1. {NO_PROMPTS}"));
            } else {
                for (index, prompt) in session.prompts.iter().enumerate() {
                    lines.push(format!("{}. {prompt}", index + 1));
                }
            }
            lines.push(String::new());
        }
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn local(hour: u32, minute: u32) -> DateTime<Local> {
        Local
            .with_ymd_and_hms(2026, 2, 9, hour, minute, 0)
            .single()
            .expect("local time")
    }

    fn session(id: &str, project: &str, hour: u32, prompts: &[&str]) -> SessionRecord {
        SessionRecord {
            session_id: id.to_string(),
            project_path: project.to_string(),
            last_updated: local(hour, 15),
            prompts: prompts.iter().map(|p| p.to_string()).collect(),
        }
    }

    #[test]
    fn empty_groups_render_only_the_indicator() {
        let doc = render_markdown(&ProjectGroups::new(), local(9, 0));
        assert!(doc.starts_with("# Workspace Activity"));
        assert!(doc.contains("*Last updated: 2026-02-09 09:00:00*"));
        assert!(doc.ends_with(NO_ACTIVE_SESSIONS));
        assert!(!doc.contains("##"));
    }

    #[test]
    fn projects_sort_case_insensitively() {
        let mut groups = ProjectGroups::new();
        for project in ["zeta", "Alpha", "beta"] {
            groups.insert(project.to_string(), vec![session("s", project, 10, &["x"])]);
        }

        let doc = render_markdown(&groups, local(12, 0));
        let alpha = doc.find("## Alpha").expect("alpha");
        let beta = doc.find("## beta").expect("beta");
        let zeta = doc.find("## zeta").expect("zeta");
        assert!(alpha < beta && beta < zeta);
    }

    #[test]
    fn sessions_list_numbered_prompts_or_placeholder() {
        let mut groups = ProjectGroups::new();
        groups.insert(
            "/repo".to_string(),
            vec![
                session("new", "/repo", 14, &["add tests", "fix lint"]),
                session("old", "/repo", 9, &[]),
            ],
        );

        let doc = render_markdown(&groups, local(15, 0));
        let expected = "\
---

## /repo
**Last updated**: 14:15
**Prompts**:
1. add tests
2. fix lint

**Last updated**: 09:15
**Prompts**:
1. (none)
";
        assert!(doc.ends_with(expected), "{doc}");
    }
}
