//! Read-side aggregation over queries and team heads.
//!
//! Nothing here mutates; counts are a point-in-time snapshot and may lag
//! concurrent lifecycle writes. Ordering and the derived figures are
//! computed in Rust over the raw counters the database returns.

use serde::Serialize;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

/// A team head with their current number of active (assigned, unanswered)
/// queries. Used to bias manual assignment toward underloaded heads.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct TeamHeadLoad {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub active_queries: i64,
}

/// Raw per-head counters as aggregated by the database.
#[derive(Debug, Clone, FromRow)]
pub struct TeamHeadCounters {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub total_assigned: i64,
    pub total_resolved: i64,
    pub active_queries: i64,
    pub avg_resolution_hours: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TeamHeadStats {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub total_assigned: i64,
    pub total_resolved: i64,
    pub active_queries: i64,
    pub avg_resolution_time_hours: f64,
    pub resolution_rate_percent: f64,
}

pub async fn fetch_load(db: &PgPool) -> sqlx::Result<Vec<TeamHeadLoad>> {
    sqlx::query_as::<_, TeamHeadLoad>(
        "SELECT u.id, u.name, u.email, \
                count(q.id) FILTER (WHERE q.status = 'ASSIGNED') AS active_queries \
         FROM users u \
         LEFT JOIN queries q ON q.assigned_to = u.id \
         WHERE u.role = 'Team_Head' \
         GROUP BY u.id, u.name, u.email",
    )
    .fetch_all(db)
    .await
}

pub async fn fetch_counters(db: &PgPool) -> sqlx::Result<Vec<TeamHeadCounters>> {
    sqlx::query_as::<_, TeamHeadCounters>(
        "SELECT u.id, u.name, u.email, \
                count(q.id) AS total_assigned, \
                count(q.id) FILTER (WHERE q.status = 'RESOLVED') AS total_resolved, \
                count(q.id) FILTER (WHERE q.status = 'ASSIGNED') AS active_queries, \
                avg(extract(epoch FROM (q.updated_at - q.created_at))::double precision / 3600.0) \
                    FILTER (WHERE q.status = 'RESOLVED') AS avg_resolution_hours \
         FROM users u \
         LEFT JOIN queries q ON q.assigned_to = u.id \
         WHERE u.role = 'Team_Head' \
         GROUP BY u.id, u.name, u.email",
    )
    .fetch_all(db)
    .await
}

/// Least busy first; ties break on id so the order is stable.
pub fn sort_by_load(mut heads: Vec<TeamHeadLoad>) -> Vec<TeamHeadLoad> {
    heads.sort_by_key(|h| (h.active_queries, h.id));
    heads
}

/// Most resolved first; ties break on id.
pub fn build_stats(counters: Vec<TeamHeadCounters>) -> Vec<TeamHeadStats> {
    let mut stats: Vec<TeamHeadStats> = counters
        .into_iter()
        .map(|c| TeamHeadStats {
            id: c.id,
            name: c.name,
            email: c.email,
            total_assigned: c.total_assigned,
            total_resolved: c.total_resolved,
            active_queries: c.active_queries,
            avg_resolution_time_hours: round1(c.avg_resolution_hours.unwrap_or(0.0)),
            resolution_rate_percent: resolution_rate_percent(c.total_resolved, c.total_assigned),
        })
        .collect();
    stats.sort_by_key(|s| (std::cmp::Reverse(s.total_resolved), s.id));
    stats
}

pub fn resolution_rate_percent(total_resolved: i64, total_assigned: i64) -> f64 {
    if total_assigned == 0 {
        return 0.0;
    }
    round1(total_resolved as f64 * 100.0 / total_assigned as f64)
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn load(name: &str, active_queries: i64) -> TeamHeadLoad {
        TeamHeadLoad {
            id: Uuid::new_v4(),
            name: name.into(),
            email: format!("{}@example.com", name.to_lowercase()),
            active_queries,
        }
    }

    fn counters(name: &str, assigned: i64, resolved: i64, active: i64) -> TeamHeadCounters {
        TeamHeadCounters {
            id: Uuid::new_v4(),
            name: name.into(),
            email: format!("{}@example.com", name.to_lowercase()),
            total_assigned: assigned,
            total_resolved: resolved,
            active_queries: active,
            avg_resolution_hours: None,
        }
    }

    #[test]
    fn least_busy_heads_come_first() {
        let sorted = sort_by_load(vec![load("A", 3), load("B", 0), load("C", 1)]);
        let names: Vec<&str> = sorted.iter().map(|h| h.name.as_str()).collect();
        assert_eq!(names, ["B", "C", "A"]);
    }

    #[test]
    fn load_ties_break_on_id() {
        let mut a = load("A", 2);
        let mut b = load("B", 2);
        if a.id > b.id {
            std::mem::swap(&mut a.id, &mut b.id);
        }
        let sorted = sort_by_load(vec![b.clone(), a.clone()]);
        assert_eq!(sorted[0].id, a.id);
        assert_eq!(sorted[1].id, b.id);
    }

    #[test]
    fn resolution_rate_is_one_decimal_percent() {
        assert_eq!(resolution_rate_percent(6, 10), 60.0);
        assert_eq!(resolution_rate_percent(1, 3), 33.3);
        assert_eq!(resolution_rate_percent(2, 3), 66.7);
        assert_eq!(resolution_rate_percent(0, 0), 0.0);
        assert_eq!(resolution_rate_percent(0, 5), 0.0);
    }

    #[test]
    fn stats_for_a_busy_head_match_the_counters() {
        let stats = build_stats(vec![counters("H", 10, 6, 4)]);
        assert_eq!(stats[0].total_assigned, 10);
        assert_eq!(stats[0].total_resolved, 6);
        assert_eq!(stats[0].active_queries, 4);
        assert_eq!(stats[0].resolution_rate_percent, 60.0);
        assert_eq!(stats[0].avg_resolution_time_hours, 0.0);
    }

    #[test]
    fn stats_sort_most_resolved_first() {
        let stats = build_stats(vec![
            counters("Low", 5, 1, 2),
            counters("High", 20, 15, 3),
            counters("Mid", 10, 6, 4),
        ]);
        let names: Vec<&str> = stats.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["High", "Mid", "Low"]);
    }

    #[test]
    fn average_resolution_time_rounds_to_one_decimal() {
        let mut c = counters("H", 4, 4, 0);
        c.avg_resolution_hours = Some(2.04);
        let stats = build_stats(vec![c]);
        assert_eq!(stats[0].avg_resolution_time_hours, 2.0);

        let mut c = counters("H", 4, 4, 0);
        c.avg_resolution_hours = Some(2.35001);
        let stats = build_stats(vec![c]);
        assert_eq!(stats[0].avg_resolution_time_hours, 2.4);
    }
}
