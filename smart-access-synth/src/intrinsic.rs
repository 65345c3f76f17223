//! Template intrinsic functions and pseudo parameters.

use serde_json::{json, Value};

pub const ACCOUNT_ID: &str = "AWS::AccountId";
pub const PARTITION: &str = "AWS::Partition";
pub const REGION: &str = "AWS::Region";
pub const URL_SUFFIX: &str = "AWS::URLSuffix";

/// `{"Ref": id}`
pub fn reference(id: impl AsRef<str>) -> Value {
    json!({ "Ref": id.as_ref() })
}

/// `{"Fn::GetAtt": [id, attribute]}`
pub fn get_att(id: impl AsRef<str>, attribute: &str) -> Value {
    json!({ "Fn::GetAtt": [id.as_ref(), attribute] })
}

/// `{"Fn::Join": ["", parts]}`
pub fn join(parts: Vec<Value>) -> Value {
    json!({ "Fn::Join": ["", parts] })
}

/// `{"Fn::Sub": template}`
pub fn sub(template: &str) -> Value {
    json!({ "Fn::Sub": template })
}

/// Dynamic reference resolving one JSON field of a stored secret at deploy time.
pub fn secret_field(secret_id: impl AsRef<str>, field: &str) -> Value {
    join(vec![
        Value::from("{{resolve:secretsmanager:"),
        reference(secret_id),
        Value::from(format!(":SecretString:{field}::}}}}")),
    ])
}

/// Ids of resources named by `Ref` and `Fn::GetAtt` anywhere in `value`,
/// excluding pseudo parameters.
pub fn referenced_ids(value: &Value) -> Vec<String> {
    let mut out = Vec::new();
    collect_references(value, &mut out);
    out
}

fn collect_references(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::Object(map) => {
            if let Some(Value::String(target)) = map.get("Ref") {
                if !target.starts_with("AWS::") {
                    out.push(target.clone());
                }
            }
            if let Some(Value::Array(args)) = map.get("Fn::GetAtt") {
                if let Some(Value::String(target)) = args.first() {
                    out.push(target.clone());
                }
            }
            for v in map.values() {
                collect_references(v, out);
            }
        }
        Value::Array(items) => {
            for v in items {
                collect_references(v, out);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secret_field_builds_dynamic_reference() {
        let value = secret_field("dbmasterusersecret", "username");
        assert_eq!(
            value,
            json!({ "Fn::Join": ["", [
                "{{resolve:secretsmanager:",
                { "Ref": "dbmasterusersecret" },
                ":SecretString:username::}}"
            ]]})
        );
    }

    #[test]
    fn referenced_ids_skips_pseudo_parameters() {
        let value = json!({
            "A": reference("MyVPC"),
            "B": [get_att("MySecurityGroup", "GroupId"), reference(REGION)],
        });
        let mut ids = referenced_ids(&value);
        ids.sort();
        assert_eq!(ids, vec!["MySecurityGroup".to_owned(), "MyVPC".to_owned()]);
    }
}
