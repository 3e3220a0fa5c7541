//! The agent's state machine.
//!
//! ```text
//! Start -> ListTables -> ResolveSchema -> FetchSchema -> GenerateQuery
//! GenerateQuery --Final/Clarify--> End
//! GenerateQuery --Retryable------> GenerateQuery
//! GenerateQuery --Continue-------> CheckQuery -> ExecuteQuery -> GenerateQuery
//! ```

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use super::policy::Decision;
use crate::error::{Result, Text2SqlError};

/// A state of the agent graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Node {
    /// Emits the synthetic `sql_db_list_tables` request.
    Start,
    ListTables,
    ResolveSchema,
    FetchSchema,
    GenerateQuery,
    CheckQuery,
    ExecuteQuery,
    End,
}

impl Node {
    pub fn is_terminal(self) -> bool {
        self == Self::End
    }
}

/// The node after `from`.
///
/// `GenerateQuery` is the only branching node and needs the decision made on
/// its output; every other node ignores `decision`.
pub fn next(from: Node, decision: Option<&Decision>) -> Result<Node> {
    let to = match from {
        Node::Start => Node::ListTables,
        Node::ListTables => Node::ResolveSchema,
        Node::ResolveSchema => Node::FetchSchema,
        Node::FetchSchema => Node::GenerateQuery,
        Node::GenerateQuery => match decision {
            Some(Decision::Final(_)) | Some(Decision::Clarify(_)) => Node::End,
            Some(Decision::Retryable(_)) => Node::GenerateQuery,
            Some(Decision::Continue) => Node::CheckQuery,
            None => {
                return Err(Text2SqlError::InvalidState(
                    "generate_query finished without a decision".into(),
                ))
            }
        },
        Node::CheckQuery => Node::ExecuteQuery,
        Node::ExecuteQuery => Node::GenerateQuery,
        Node::End => {
            return Err(Text2SqlError::InvalidState(
                "no transition out of the end state".into(),
            ))
        }
    };
    Ok(to)
}

/// Whether moving `from -> to` re-enters query generation after a cycle.
pub fn is_retry(from: Node, to: Node) -> bool {
    to == Node::GenerateQuery && matches!(from, Node::GenerateQuery | Node::ExecuteQuery)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn linear_prefix_reaches_generation() {
        let mut node = Node::Start;
        let mut path = vec![node];
        while node != Node::GenerateQuery {
            node = next(node, None).unwrap();
            path.push(node);
        }
        assert_eq!(
            path,
            vec![
                Node::Start,
                Node::ListTables,
                Node::ResolveSchema,
                Node::FetchSchema,
                Node::GenerateQuery
            ]
        );
    }

    #[test]
    fn generation_branches_on_decision() {
        let cases = [
            (Decision::Final("3".into()), Node::End),
            (Decision::Clarify("which?".into()), Node::End),
            (Decision::Retryable("Error: x".into()), Node::GenerateQuery),
            (Decision::Continue, Node::CheckQuery),
        ];
        for (decision, expected) in cases {
            assert_eq!(next(Node::GenerateQuery, Some(&decision)).unwrap(), expected);
        }
        assert!(next(Node::GenerateQuery, None).is_err());
    }

    #[test]
    fn execution_loops_back_to_generation() {
        assert_eq!(next(Node::CheckQuery, None).unwrap(), Node::ExecuteQuery);
        assert_eq!(next(Node::ExecuteQuery, None).unwrap(), Node::GenerateQuery);
        assert!(is_retry(Node::ExecuteQuery, Node::GenerateQuery));
        assert!(!is_retry(Node::FetchSchema, Node::GenerateQuery));
        assert!(next(Node::End, None).is_err());
    }

    #[test]
    fn node_names_round_trip_through_strum() {
        assert_eq!(Node::ResolveSchema.to_string(), "resolve_schema");
        assert_eq!("execute_query".parse::<Node>().unwrap(), Node::ExecuteQuery);
    }
}
