//! Requests prepared for execution.

use crate::models::HttpRequest;
use crate::template::RequestTemplate;
use crate::variables::VariableSubstitutor;
use std::path::Path;

/// A parsed request bound to the substitutor that resolves its variables.
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    template: RequestTemplate,
    substitutor: VariableSubstitutor,
}

impl RequestDescriptor {
    /// Binds `template` to the substitutor it renders against.
    pub fn new(template: RequestTemplate, substitutor: VariableSubstitutor) -> Self {
        Self {
            template,
            substitutor,
        }
    }

    pub fn template(&self) -> &RequestTemplate {
        &self.template
    }

    pub fn substitutor(&self) -> &VariableSubstitutor {
        &self.substitutor
    }

    /// Stable identifier derived from the source file and line.
    pub fn id(&self) -> &str {
        &self.template.id
    }

    /// The `@name` tag, or the method and raw target.
    pub fn display_name(&self) -> String {
        self.template.display_name()
    }

    /// File the request was parsed from, if any.
    pub fn file(&self) -> Option<&Path> {
        self.template.location.file.as_deref()
    }

    /// Renders the request against the current scope state.
    pub fn render(&self) -> HttpRequest {
        self.template.render(&self.substitutor)
    }
}

/// Ordered requests of one run; order is execution order.
#[derive(Debug, Clone, Default)]
pub struct ExecutionBatch {
    descriptors: Vec<RequestDescriptor>,
}

impl ExecutionBatch {
    /// Binds every template to `substitutor`. All descriptors share its
    /// transient variables.
    pub fn new(templates: Vec<RequestTemplate>, substitutor: &VariableSubstitutor) -> Self {
        let descriptors = templates
            .into_iter()
            .map(|template| RequestDescriptor::new(template, substitutor.clone()))
            .collect();
        Self { descriptors }
    }

    /// Batch over already-bound descriptors.
    pub fn from_descriptors(descriptors: Vec<RequestDescriptor>) -> Self {
        Self { descriptors }
    }

    pub fn descriptors(&self) -> &[RequestDescriptor] {
        &self.descriptors
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    pub fn into_descriptors(self) -> Vec<RequestDescriptor> {
        self.descriptors
    }
}
