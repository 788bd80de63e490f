//! The fixed set of resources that wire Core Web Vitals into a container.

use super::types::{
    EventTagConfig, ResourceConfig, ResourceId, ResourceRequest, TagConfig, TemplateConfig,
    TriggerConfig, VariableConfig, WorkspacePath,
};

pub const TAG_NAME: &str = "CWV - web-vitals loader";
pub const TRIGGER_NAME: &str = "CWV - core-web-vitals event";
pub const EVENT_TAG_NAME: &str = "CWV - GA4 event";
pub const TEMPLATE_NAME: &str = "gPS Core Web Vitals Template";

/// dataLayer event pushed by the loader for every measurement.
pub const DATA_LAYER_EVENT: &str = "core-web-vitals";

/// Built-in "All Pages" trigger present in every web container.
pub const ALL_PAGES_TRIGGER_ID: &str = "2147479553";

/// Loads the web-vitals attribution build and pushes each measurement to the
/// dataLayer under `DATA_LAYER_EVENT`.
pub const WEB_VITALS_HTML: &str = r#"<script>
(function () {
  function push(metric) {
    window.dataLayer = window.dataLayer || [];
    window.dataLayer.push({
      event: 'core-web-vitals',
      data: {
        metric_name: metric.name,
        metric_id: metric.id,
        metric_rating: metric.rating,
        metric_value: metric.value,
        value: metric.delta
      }
    });
  }
  var script = document.createElement('script');
  script.src = 'https://unpkg.com/web-vitals@3/dist/web-vitals.attribution.iife.js';
  script.onload = function () {
    webVitals.onCLS(push);
    webVitals.onFID(push);
    webVitals.onLCP(push);
    webVitals.onINP(push);
    webVitals.onTTFB(push);
  };
  document.head.appendChild(script);
})();
</script>"#;

/// Custom template bundled with the binary.
pub const BUNDLED_TEMPLATE: &str = include_str!("../../assets/cwv-template.tpl");

/// dataLayer variables read by the event tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum VitalsVariable {
    MetricName,
    MetricId,
    MetricRating,
    MetricValue,
    Delta,
}

impl VitalsVariable {
    pub const ALL: [VitalsVariable; 5] = [
        VitalsVariable::MetricName,
        VitalsVariable::MetricId,
        VitalsVariable::MetricRating,
        VitalsVariable::MetricValue,
        VitalsVariable::Delta,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            VitalsVariable::MetricName => "CWV - metric name",
            VitalsVariable::MetricId => "CWV - metric id",
            VitalsVariable::MetricRating => "CWV - metric rating",
            VitalsVariable::MetricValue => "CWV - metric value",
            VitalsVariable::Delta => "CWV - delta",
        }
    }

    pub fn data_layer_key(&self) -> &'static str {
        match self {
            VitalsVariable::MetricName => "data.metric_name",
            VitalsVariable::MetricId => "data.metric_id",
            VitalsVariable::MetricRating => "data.metric_rating",
            VitalsVariable::MetricValue => "data.metric_value",
            VitalsVariable::Delta => "data.value",
        }
    }

    /// GA4 event parameter carrying this variable. The metric name is the
    /// event name itself and has no parameter.
    pub fn event_parameter(&self) -> Option<&'static str> {
        match self {
            VitalsVariable::MetricName => None,
            VitalsVariable::MetricId => Some("metric_id"),
            VitalsVariable::MetricRating => Some("metric_rating"),
            VitalsVariable::MetricValue => Some("metric_value"),
            VitalsVariable::Delta => Some("value"),
        }
    }

    /// `{{name}}` reference as used inside other resources.
    pub fn reference(&self) -> String {
        format!("{{{{{}}}}}", self.name())
    }
}

pub fn vitals_tag_request(parent: &WorkspacePath) -> ResourceRequest {
    ResourceRequest::new(
        parent.clone(),
        TAG_NAME,
        ResourceConfig::Tag(TagConfig {
            html: WEB_VITALS_HTML.to_string(),
            firing_trigger_ids: vec![ResourceId::from(ALL_PAGES_TRIGGER_ID)],
        }),
    )
}

pub fn trigger_request(parent: &WorkspacePath) -> ResourceRequest {
    ResourceRequest::new(
        parent.clone(),
        TRIGGER_NAME,
        ResourceConfig::Trigger(TriggerConfig {
            event_name: DATA_LAYER_EVENT.to_string(),
        }),
    )
}

pub fn variable_request(parent: &WorkspacePath, variable: VitalsVariable) -> ResourceRequest {
    ResourceRequest::new(
        parent.clone(),
        variable.name(),
        ResourceConfig::Variable(VariableConfig {
            data_layer_key: variable.data_layer_key().to_string(),
        }),
    )
}

/// The event tag fires on the custom-event trigger and references every
/// variable by the same names the variables stage created.
pub fn event_tag_request(
    parent: &WorkspacePath,
    measurement_id: &str,
    trigger_id: &ResourceId,
) -> ResourceRequest {
    let event_parameters = VitalsVariable::ALL
        .iter()
        .filter_map(|v| v.event_parameter().map(|p| (p.to_string(), v.reference())))
        .collect();

    ResourceRequest::new(
        parent.clone(),
        EVENT_TAG_NAME,
        ResourceConfig::EventTag(EventTagConfig {
            measurement_id: measurement_id.to_string(),
            event_name: VitalsVariable::MetricName.reference(),
            event_parameters,
            firing_trigger_id: trigger_id.clone(),
        }),
    )
}

pub fn template_request(
    parent: &WorkspacePath,
    name: &str,
    template_data: impl Into<String>,
) -> ResourceRequest {
    ResourceRequest::new(
        parent.clone(),
        name,
        ResourceConfig::Template(TemplateConfig {
            template_data: template_data.into(),
        }),
    )
}
