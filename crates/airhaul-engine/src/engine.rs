//! Template engine based on MiniJinja

use airhaul_core::{LoadedChart, Values};
use minijinja::Environment;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;

use crate::error::{EngineError, Result, TemplateError};
use crate::filters;
use crate::functions;

/// Release identity exposed to templates as `release`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseInfo {
    pub name: String,
    pub namespace: String,
}

impl ReleaseInfo {
    pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
        }
    }

    /// Release named after the chart, in the `default` namespace
    pub fn for_chart(chart: &LoadedChart) -> Self {
        Self::new(chart.name(), "default")
    }
}

/// Result of rendering a chart
#[derive(Debug, Default)]
pub struct RenderedChart {
    /// Rendered manifests by template name, CRDs under `crds/`
    pub manifests: BTreeMap<String, String>,
}

impl RenderedChart {
    /// Split every manifest into its YAML documents
    ///
    /// Empty documents are dropped.
    pub fn objects(&self) -> Result<Vec<JsonValue>> {
        let mut objects = Vec::new();

        for (name, manifest) in &self.manifests {
            for document in serde_yaml::Deserializer::from_str(manifest) {
                let value = JsonValue::deserialize(document).map_err(|source| {
                    EngineError::Manifest {
                        template: name.clone(),
                        source,
                    }
                })?;
                if !value.is_null() {
                    objects.push(value);
                }
            }
        }

        Ok(objects)
    }
}

/// The template engine
///
/// Undefined values render as empty so charts with optional sections
/// still yield manifests to scan.
#[derive(Debug, Clone, Copy, Default)]
pub struct Engine;

impl Engine {
    /// Create a configured MiniJinja environment
    fn create_environment(&self) -> Environment<'static> {
        let mut env = Environment::new();
        env.set_undefined_behavior(minijinja::UndefinedBehavior::Lenient);

        env.add_filter("toyaml", filters::toyaml);
        env.add_filter("tojson", filters::tojson);
        env.add_filter("b64encode", filters::b64encode);
        env.add_filter("quote", filters::quote);
        env.add_filter("nindent", filters::nindent);
        env.add_filter("indent", filters::indent);
        env.add_filter("required", filters::required);
        env.add_filter("sha256", filters::sha256sum);
        env.add_filter("trunc", filters::trunc);
        env.add_filter("trimprefix", filters::trimprefix);
        env.add_filter("trimsuffix", filters::trimsuffix);

        env.add_function("fail", functions::fail);
        env.add_function("dict", functions::dict);
        env.add_function("list", functions::list);
        env.add_function("get", functions::get);
        env.add_function("coalesce", functions::coalesce);
        env.add_function("ternary", functions::ternary);
        env.add_function("tostring", functions::tostring);

        env
    }

    /// Render every template of a chart with `overlay` merged over its defaults
    pub fn render_chart(
        &self,
        chart: &LoadedChart,
        overlay: &Values,
        release: &ReleaseInfo,
    ) -> Result<RenderedChart> {
        let mut values = chart.values.clone();
        values.merge(overlay);

        let mut env = self.create_environment();

        // Helpers must be loaded before anything that imports them
        for (name, source) in &chart.templates {
            env.add_template_owned(name.clone(), source.clone())
                .map_err(|e| TemplateError::from_minijinja(e, name, source))?;
        }

        let ctx = minijinja::context! {
            values => values.inner(),
            release => release,
            chart => &chart.metadata,
        };

        let mut rendered = RenderedChart::default();

        for (name, content) in &chart.crds {
            rendered.manifests.insert(format!("crds/{}", name), content.clone());
        }

        for (name, source) in &chart.templates {
            if is_helper(name) || is_notes(name) {
                continue;
            }

            let output = env
                .get_template(name)
                .and_then(|tmpl| tmpl.render(&ctx))
                .map_err(|e| TemplateError::from_minijinja(e, name, source))?;

            let trimmed = output.trim();
            if trimmed.is_empty() || trimmed == "---" {
                continue;
            }

            let output_name = name.trim_end_matches(".j2").trim_end_matches(".jinja2");
            rendered.manifests.insert(output_name.to_string(), output);
        }

        tracing::debug!(
            chart = chart.name(),
            manifests = rendered.manifests.len(),
            "rendered chart"
        );

        Ok(rendered)
    }
}

fn file_name(name: &str) -> &str {
    name.rsplit('/').next().unwrap_or(name)
}

fn is_helper(name: &str) -> bool {
    file_name(name).starts_with('_')
}

fn is_notes(name: &str) -> bool {
    file_name(name).to_lowercase().starts_with("notes")
}

#[cfg(test)]
mod tests {
    use super::*;
    use airhaul_core::ChartMetadata;

    fn chart(templates: &[(&str, &str)]) -> LoadedChart {
        LoadedChart {
            metadata: ChartMetadata {
                api_version: Some("v2".to_string()),
                name: "demo".to_string(),
                version: "0.1.0".to_string(),
                app_version: Some("1.25".to_string()),
                description: None,
            },
            values: Values::from_yaml("image:\n  repository: nginx\n  tag: \"1.25\"\n").unwrap(),
            templates: templates
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            crds: BTreeMap::new(),
        }
    }

    const DEPLOYMENT: &str = r#"apiVersion: apps/v1
kind: Deployment
metadata:
  name: {{ release.name }}
  namespace: {{ release.namespace }}
spec:
  template:
    spec:
      containers:
        - name: app
          image: "{{ values.image.repository }}:{{ values.image.tag }}"
"#;

    #[test]
    fn test_render_with_defaults() {
        let chart = chart(&[("deployment.yaml", DEPLOYMENT)]);
        let engine = Engine::default();

        let rendered = engine
            .render_chart(&chart, &Values::new(), &ReleaseInfo::for_chart(&chart))
            .unwrap();
        let objects = rendered.objects().unwrap();

        assert_eq!(objects.len(), 1);
        assert_eq!(objects[0]["metadata"]["name"], "demo");
        assert_eq!(
            objects[0]["spec"]["template"]["spec"]["containers"][0]["image"],
            "nginx:1.25"
        );
    }

    #[test]
    fn test_overlay_wins() {
        let chart = chart(&[("deployment.yaml", DEPLOYMENT)]);
        let overlay = Values::from_yaml("image:\n  tag: \"1.27\"\n").unwrap();

        let objects = Engine::default()
            .render_chart(&chart, &overlay, &ReleaseInfo::new("web", "apps"))
            .unwrap()
            .objects()
            .unwrap();

        assert_eq!(objects[0]["metadata"]["namespace"], "apps");
        assert_eq!(
            objects[0]["spec"]["template"]["spec"]["containers"][0]["image"],
            "nginx:1.27"
        );
    }

    #[test]
    fn test_helpers_and_notes_not_emitted() {
        let chart = chart(&[
            ("_helpers.tpl", "{% macro name() %}demo-app{% endmacro %}"),
            (
                "svc.yaml",
                "{% from \"_helpers.tpl\" import name %}kind: Service\nmetadata:\n  name: {{ name() }}\n",
            ),
            ("NOTES.txt", "Thanks for installing"),
        ]);

        let rendered = Engine::default()
            .render_chart(&chart, &Values::new(), &ReleaseInfo::for_chart(&chart))
            .unwrap();

        assert_eq!(rendered.manifests.keys().collect::<Vec<_>>(), vec!["svc.yaml"]);
        assert_eq!(rendered.objects().unwrap()[0]["metadata"]["name"], "demo-app");
    }

    #[test]
    fn test_multi_document_manifest() {
        let chart = chart(&[(
            "all.yaml",
            "kind: A\n---\n---\nkind: B\n{% if values.extra %}---\nkind: C\n{% endif %}",
        )]);

        let objects = Engine::default()
            .render_chart(&chart, &Values::new(), &ReleaseInfo::for_chart(&chart))
            .unwrap()
            .objects()
            .unwrap();

        let kinds: Vec<_> = objects.iter().map(|o| o["kind"].clone()).collect();
        assert_eq!(kinds, vec!["A", "B"]);
    }

    #[test]
    fn test_crds_included_raw() {
        let mut chart = chart(&[]);
        chart
            .crds
            .insert("crd.yaml".to_string(), "kind: CustomResourceDefinition\n".to_string());

        let rendered = Engine::default()
            .render_chart(&chart, &Values::new(), &ReleaseInfo::for_chart(&chart))
            .unwrap();
        assert!(rendered.manifests.contains_key("crds/crd.yaml"));
    }

    #[test]
    fn test_undefined_values_render_empty() {
        let chart = chart(&[("cm.yaml", "kind: ConfigMap\ndata:\n  x: \"{{ values.missing }}\"\n")]);
        let objects = Engine
            .render_chart(&chart, &Values::new(), &ReleaseInfo::for_chart(&chart))
            .unwrap()
            .objects()
            .unwrap();
        assert_eq!(objects[0]["data"]["x"], "");
    }

    #[test]
    fn test_invalid_rendered_yaml() {
        let chart = chart(&[("bad.yaml", "kind: [unclosed\n")]);
        let rendered = Engine::default()
            .render_chart(&chart, &Values::new(), &ReleaseInfo::for_chart(&chart))
            .unwrap();
        assert!(matches!(
            rendered.objects(),
            Err(EngineError::Manifest { ref template, .. }) if template == "bad.yaml"
        ));
    }
}
