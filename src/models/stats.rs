//! Dashboard statistics.

use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use super::project::ProjectResponse;
use super::sprint::StatusCounts;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AssigneeLoad {
    #[serde(rename = "usuarioId")]
    pub user_id: Uuid,
    #[serde(rename = "nombre")]
    pub name: Option<String>,
    pub total: u64,
    #[serde(rename = "completadas")]
    pub completed: u64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DashboardStats {
    #[serde(rename = "totalProyectos")]
    pub total_projects: u64,
    #[serde(rename = "tareasPorEstado")]
    pub tasks_by_status: StatusCounts,
    #[serde(rename = "tareasVencidas")]
    pub overdue_tasks: u64,
    #[serde(rename = "tareasPorUsuario")]
    pub tasks_by_assignee: Vec<AssigneeLoad>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ProjectStats {
    #[serde(rename = "proyecto")]
    pub project: ProjectResponse,
    #[serde(rename = "tareasPorEstado")]
    pub tasks_by_status: StatusCounts,
    #[serde(rename = "tareasVencidas")]
    pub overdue_tasks: u64,
    #[serde(rename = "tareasPorUsuario")]
    pub tasks_by_assignee: Vec<AssigneeLoad>,
    #[serde(rename = "porcentajeCompletado")]
    pub completion_percentage: f64,
}

/// Percentage with one decimal; zero for an empty project.
pub fn completion_percentage(completed: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (completed as f64 * 1000.0 / total as f64).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completion_percentage() {
        assert_eq!(completion_percentage(0, 0), 0.0);
        assert_eq!(completion_percentage(1, 3), 33.3);
        assert_eq!(completion_percentage(2, 3), 66.7);
        assert_eq!(completion_percentage(4, 4), 100.0);
    }
}
