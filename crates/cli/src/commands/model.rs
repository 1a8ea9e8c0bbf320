//! Object model inspection

use anyhow::Result;
use tabled::Tabled;

use crate::client::{ApiClient, ModelSnapshot, ObjectSnapshot};
use crate::output::{format_attribute, print_json, print_table, OutputFormat};

/// Row for the model objects table
#[derive(Tabled)]
struct ObjectRow {
    #[tabled(rename = "Object")]
    name: String,
    #[tabled(rename = "Class")]
    class: String,
    #[tabled(rename = "Attributes")]
    attributes: String,
}

impl From<&ObjectSnapshot> for ObjectRow {
    fn from(obj: &ObjectSnapshot) -> Self {
        let attributes = obj
            .attributes
            .iter()
            .map(|(name, value)| format!("{}={}", name, format_attribute(value)))
            .collect::<Vec<_>>()
            .join(", ");

        Self {
            name: obj.name.clone(),
            class: obj.class.clone(),
            attributes,
        }
    }
}

/// Show the agent's object model, optionally restricted to one class
pub async fn show_model(
    client: &ApiClient,
    class: Option<String>,
    format: OutputFormat,
) -> Result<()> {
    let mut snapshot: ModelSnapshot = client.get("api/v1/model").await?;
    filter_class(&mut snapshot, class.as_deref());

    match format {
        OutputFormat::Json => print_json(&snapshot)?,
        OutputFormat::Table => {
            let rows: Vec<ObjectRow> = snapshot.objects.iter().map(ObjectRow::from).collect();
            print_table(&rows);
            if !rows.is_empty() {
                println!("\nTotal: {} objects", rows.len());
            }
        }
    }
    Ok(())
}

fn filter_class(snapshot: &mut ModelSnapshot, class: Option<&str>) {
    if let Some(class) = class {
        snapshot.objects.retain(|o| o.class.eq_ignore_ascii_case(class));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> ModelSnapshot {
        serde_json::from_str(
            r#"{"objects": [
                {"name": "ac", "class": "AireAcondicionado", "attributes": {"temperatura": 22}},
                {"name": "light", "class": "Luz", "attributes": {"intensidad": 19}},
                {"name": "room", "class": "Habitacion",
                 "attributes": {"luzIdealPromedio": 18.0, "temperaturaIdealPromedio": 22.5}}
            ]}"#,
        )
        .unwrap()
    }

    #[test]
    fn test_filter_class_is_case_insensitive() {
        let mut snapshot = snapshot();
        filter_class(&mut snapshot, Some("luz"));
        assert_eq!(snapshot.objects.len(), 1);
        assert_eq!(snapshot.objects[0].name, "light");
    }

    #[test]
    fn test_no_filter_keeps_everything() {
        let mut snapshot = snapshot();
        filter_class(&mut snapshot, None);
        assert_eq!(snapshot.objects.len(), 3);
    }

    #[test]
    fn test_object_row_lists_attributes_in_order() {
        let snapshot = snapshot();
        let row = ObjectRow::from(&snapshot.objects[2]);
        assert_eq!(
            row.attributes,
            "luzIdealPromedio=18.0, temperaturaIdealPromedio=22.5"
        );
    }
}
