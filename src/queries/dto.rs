use serde::Deserialize;
use uuid::Uuid;

/// All fields are optional at the serde layer so that a missing field is
/// reported as a validation error instead of a deserialization failure.
#[derive(Debug, Deserialize)]
pub struct CreateQueryRequest {
    pub title: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AssignRequest {
    #[serde(alias = "teamHeadId")]
    pub team_head_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct AnswerRequest {
    pub answer: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DismantleRequest {
    pub reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assign_request_accepts_both_spellings() {
        let id = Uuid::new_v4();
        let camel: AssignRequest =
            serde_json::from_str(&format!("{{\"teamHeadId\":\"{id}\"}}")).unwrap();
        let snake: AssignRequest =
            serde_json::from_str(&format!("{{\"team_head_id\":\"{id}\"}}")).unwrap();
        assert_eq!(camel.team_head_id, Some(id));
        assert_eq!(snake.team_head_id, Some(id));
    }

    #[test]
    fn missing_fields_deserialize_to_none() {
        let req: CreateQueryRequest = serde_json::from_str("{}").unwrap();
        assert!(req.title.is_none());
        assert!(req.description.is_none());
        let req: AnswerRequest = serde_json::from_str("{}").unwrap();
        assert!(req.answer.is_none());
    }
}
