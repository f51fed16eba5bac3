//! Template value expressions.
//!
//! A property value is either a literal string or a reference the
//! provisioning engine resolves at deploy time. Serialization produces the
//! intrinsic-function JSON the engine expects: `{"Ref": ..}`,
//! `{"Fn::GetAtt": [..]}` and `{"Fn::Join": [..]}`.

use serde::ser::{Serialize, SerializeMap, Serializer};

/// A literal value or an engine-resolved reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    /// A plain string, emitted as-is.
    Lit(String),
    /// `Ref` to a parameter, a resource, or a pseudo parameter.
    Ref(String),
    /// `Fn::GetAtt` on an attribute of a resource.
    GetAtt(String, String),
    /// `Fn::Join` of parts with a delimiter.
    Join(String, Vec<Expr>),
}

impl Expr {
    pub fn lit(value: impl Into<String>) -> Self {
        Self::Lit(value.into())
    }

    pub fn get_att(logical_id: impl Into<String>, attribute: impl Into<String>) -> Self {
        Self::GetAtt(logical_id.into(), attribute.into())
    }

    pub fn join(delimiter: impl Into<String>, parts: Vec<Expr>) -> Self {
        Self::Join(delimiter.into(), parts)
    }
}

impl Serialize for Expr {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Expr::Lit(value) => serializer.serialize_str(value),
            Expr::Ref(logical_id) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("Ref", logical_id)?;
                map.end()
            }
            Expr::GetAtt(logical_id, attribute) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("Fn::GetAtt", &[logical_id.as_str(), attribute.as_str()])?;
                map.end()
            }
            Expr::Join(delimiter, parts) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("Fn::Join", &JoinArgs(delimiter, parts))?;
                map.end()
            }
        }
    }
}

/// `Fn::Join` takes a two-element array: the delimiter and the parts.
struct JoinArgs<'a>(&'a str, &'a [Expr]);

impl Serialize for JoinArgs<'_> {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        use serde::ser::SerializeSeq;
        let mut seq = serializer.serialize_seq(Some(2))?;
        seq.serialize_element(self.0)?;
        seq.serialize_element(self.1)?;
        seq.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn to_json(expr: &Expr) -> String {
        serde_json::to_string(expr).unwrap()
    }

    #[test]
    fn test_lit_serializes_as_plain_string() {
        assert_eq!(to_json(&Expr::lit("query_id")), r#""query_id""#);
    }

    #[test]
    fn test_ref_serializes_as_intrinsic() {
        assert_eq!(
            to_json(&Expr::Ref("QueryTable".to_string())),
            r#"{"Ref":"QueryTable"}"#
        );
    }

    #[test]
    fn test_get_att_serializes_as_intrinsic() {
        assert_eq!(
            to_json(&Expr::get_att("QueryTable", "Arn")),
            r#"{"Fn::GetAtt":["QueryTable","Arn"]}"#
        );
    }

    #[test]
    fn test_join_serializes_delimiter_and_parts() {
        let expr = Expr::join(
            "/",
            vec![Expr::get_att("QueryTable", "Arn"), Expr::lit("index/*")],
        );
        assert_eq!(
            to_json(&expr),
            r#"{"Fn::Join":["/",[{"Fn::GetAtt":["QueryTable","Arn"]},"index/*"]]}"#
        );
    }

    #[test]
    fn test_join_nests_refs() {
        let expr = Expr::join(
            "",
            vec![
                Expr::lit("arn:"),
                Expr::Ref("AWS::Partition".to_string()),
                Expr::lit(":iam::aws:policy/AmazonBedrockFullAccess"),
            ],
        );
        assert_eq!(
            to_json(&expr),
            r#"{"Fn::Join":["",["arn:",{"Ref":"AWS::Partition"},":iam::aws:policy/AmazonBedrockFullAccess"]]}"#
        );
    }
}
