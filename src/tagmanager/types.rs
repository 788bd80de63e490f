use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;

/// Address of a Tag Manager workspace, the parent of every resource we create.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkspacePath {
    pub account_id: String,
    pub container_id: String,
    pub workspace_id: String,
}

impl WorkspacePath {
    pub fn new(
        account_id: impl Into<String>,
        container_id: impl Into<String>,
        workspace_id: impl Into<String>,
    ) -> Self {
        Self {
            account_id: account_id.into(),
            container_id: container_id.into(),
            workspace_id: workspace_id.into(),
        }
    }
}

impl fmt::Display for WorkspacePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "accounts/{}/containers/{}/workspaces/{}",
            self.account_id, self.container_id, self.workspace_id
        )
    }
}

/// Identifier minted by the remote API for a created resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceId(pub String);

impl ResourceId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ResourceId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceKind {
    Tag,
    Trigger,
    Variable,
    EventTag,
    Template,
}

impl ResourceKind {
    /// Collection segment appended to the workspace path.
    pub fn collection(&self) -> &'static str {
        match self {
            ResourceKind::Tag | ResourceKind::EventTag => "tags",
            ResourceKind::Trigger => "triggers",
            ResourceKind::Variable => "variables",
            ResourceKind::Template => "templates",
        }
    }

    /// Response field carrying the minted identifier.
    pub fn id_field(&self) -> &'static str {
        match self {
            ResourceKind::Tag | ResourceKind::EventTag => "tagId",
            ResourceKind::Trigger => "triggerId",
            ResourceKind::Variable => "variableId",
            ResourceKind::Template => "templateId",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ResourceKind::Tag => "tag",
            ResourceKind::Trigger => "trigger",
            ResourceKind::Variable => "variable",
            ResourceKind::EventTag => "event tag",
            ResourceKind::Template => "template",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterType {
    Template,
    Boolean,
    Integer,
    List,
    Map,
}

/// Tag Manager `Parameter` as it appears on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    #[serde(rename = "type")]
    pub kind: ParameterType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub list: Option<Vec<Parameter>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub map: Option<Vec<Parameter>>,
}

impl Parameter {
    fn scalar(kind: ParameterType, key: Option<&str>, value: impl Into<String>) -> Self {
        Self {
            kind,
            key: key.map(str::to_string),
            value: Some(value.into()),
            list: None,
            map: None,
        }
    }

    pub fn template(key: &str, value: impl Into<String>) -> Self {
        Self::scalar(ParameterType::Template, Some(key), value)
    }

    pub fn boolean(key: &str, value: bool) -> Self {
        Self::scalar(ParameterType::Boolean, Some(key), value.to_string())
    }

    pub fn integer(key: &str, value: i64) -> Self {
        Self::scalar(ParameterType::Integer, Some(key), value.to_string())
    }

    pub fn list(key: &str, items: Vec<Parameter>) -> Self {
        Self {
            kind: ParameterType::List,
            key: Some(key.to_string()),
            value: None,
            list: Some(items),
            map: None,
        }
    }

    /// Keyless map entry, used as an element of a list parameter.
    pub fn map(entries: Vec<Parameter>) -> Self {
        Self {
            kind: ParameterType::Map,
            key: None,
            value: None,
            list: None,
            map: Some(entries),
        }
    }
}

/// Custom HTML tag: template content plus the triggers it fires on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagConfig {
    pub html: String,
    pub firing_trigger_ids: Vec<ResourceId>,
}

/// Custom-event trigger matching a single dataLayer event name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerConfig {
    pub event_name: String,
}

/// Data layer variable reading one key from the pushed event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableConfig {
    pub data_layer_key: String,
}

/// GA4 event tag forwarding the measurement to a property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventTagConfig {
    pub measurement_id: String,
    pub event_name: String,
    /// `(parameter name, value)` pairs, values usually `{{variable}}` references.
    pub event_parameters: Vec<(String, String)>,
    pub firing_trigger_id: ResourceId,
}

/// Community template source (`___INFO___`, `___SANDBOXED_JS...` sections).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateConfig {
    pub template_data: String,
}

/// Closed set of per-kind configurations. The kind of a request is derived
/// from the variant, so a payload can never be sent to the wrong collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceConfig {
    Tag(TagConfig),
    Trigger(TriggerConfig),
    Variable(VariableConfig),
    EventTag(EventTagConfig),
    Template(TemplateConfig),
}

impl ResourceConfig {
    pub fn kind(&self) -> ResourceKind {
        match self {
            ResourceConfig::Tag(_) => ResourceKind::Tag,
            ResourceConfig::Trigger(_) => ResourceKind::Trigger,
            ResourceConfig::Variable(_) => ResourceKind::Variable,
            ResourceConfig::EventTag(_) => ResourceKind::EventTag,
            ResourceConfig::Template(_) => ResourceKind::Template,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRequest {
    pub parent: WorkspacePath,
    pub name: String,
    pub config: ResourceConfig,
}

impl ResourceRequest {
    pub fn new(parent: WorkspacePath, name: impl Into<String>, config: ResourceConfig) -> Self {
        Self {
            parent,
            name: name.into(),
            config,
        }
    }

    pub fn kind(&self) -> ResourceKind {
        self.config.kind()
    }

    /// Request body for the Tag Manager v2 `create` call.
    pub fn to_body(&self) -> Value {
        match &self.config {
            ResourceConfig::Tag(tag) => json!({
                "name": self.name,
                "type": "html",
                "parameter": [Parameter::template("html", tag.html.clone())],
                "firingTriggerId": tag.firing_trigger_ids,
            }),
            ResourceConfig::Trigger(trigger) => json!({
                "name": self.name,
                "type": "customEvent",
                "customEventFilter": [{
                    "type": "equals",
                    "parameter": [
                        Parameter::template("arg0", "{{_event}}"),
                        Parameter::template("arg1", trigger.event_name.clone()),
                    ],
                }],
            }),
            ResourceConfig::Variable(variable) => json!({
                "name": self.name,
                "type": "v",
                "parameter": [
                    Parameter::integer("dataLayerVersion", 2),
                    Parameter::boolean("setDefaultValue", false),
                    Parameter::template("name", variable.data_layer_key.clone()),
                ],
            }),
            ResourceConfig::EventTag(event) => {
                let rows = event
                    .event_parameters
                    .iter()
                    .map(|(name, value)| {
                        Parameter::map(vec![
                            Parameter::template("name", name.clone()),
                            Parameter::template("value", value.clone()),
                        ])
                    })
                    .collect();
                json!({
                    "name": self.name,
                    "type": "gaawe",
                    "parameter": [
                        Parameter::boolean("sendEcommerceData", false),
                        Parameter::template("eventName", event.event_name.clone()),
                        Parameter::template("measurementIdOverride", event.measurement_id.clone()),
                        Parameter::list("eventParameters", rows),
                    ],
                    "firingTriggerId": [event.firing_trigger_id],
                })
            }
            ResourceConfig::Template(template) => json!({
                "name": self.name,
                "templateData": template.template_data,
            }),
        }
    }
}
