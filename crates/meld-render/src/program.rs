//! Shader programs: WGSL compiled through naga, with reflected binding names

use crate::context::pop_validation_error;
use meld_core::{MeldError, Result};
use std::collections::HashMap;

/// Where a named resource lives in the bind group layout
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UniformSlot {
    pub group: u32,
    pub binding: u32,
}

/// Names found in a WGSL module
#[derive(Clone, Debug, Default)]
pub struct ProgramInfo {
    uniforms: HashMap<String, UniformSlot>,
    attributes: HashMap<String, u32>,
    entry_points: Vec<String>,
}

impl ProgramInfo {
    /// Parse and validate `source`, collecting resource bindings and vertex
    /// input locations
    pub fn reflect(label: &str, source: &str) -> Result<Self> {
        let module = naga::front::wgsl::parse_str(source).map_err(|e| {
            MeldError::CompileError(format!("{}: {}", label, e.emit_to_string(source)))
        })?;
        naga::valid::Validator::new(
            naga::valid::ValidationFlags::all(),
            naga::valid::Capabilities::all(),
        )
        .validate(&module)
        .map_err(|e| MeldError::CompileError(format!("{}: {}", label, e)))?;

        let mut info = Self::default();
        for (_, var) in module.global_variables.iter() {
            if let (Some(name), Some(binding)) = (&var.name, &var.binding) {
                info.uniforms.insert(
                    name.clone(),
                    UniformSlot {
                        group: binding.group,
                        binding: binding.binding,
                    },
                );
            }
        }

        for ep in &module.entry_points {
            info.entry_points.push(ep.name.clone());
            if ep.stage != naga::ShaderStage::Vertex {
                continue;
            }
            for arg in &ep.function.arguments {
                match &arg.binding {
                    Some(naga::Binding::Location { location, .. }) => {
                        if let Some(name) = &arg.name {
                            info.attributes.insert(name.clone(), *location);
                        }
                    }
                    Some(naga::Binding::BuiltIn(_)) => {}
                    None => {
                        if let naga::TypeInner::Struct { members, .. } = &module.types[arg.ty].inner
                        {
                            for member in members {
                                if let (Some(name), Some(naga::Binding::Location { location, .. })) =
                                    (&member.name, &member.binding)
                                {
                                    info.attributes.insert(name.clone(), *location);
                                }
                            }
                        }
                    }
                }
            }
        }
        Ok(info)
    }

    pub fn get_uniform(&self, name: &str) -> Option<UniformSlot> {
        self.uniforms.get(name).copied()
    }

    pub fn get_attribute(&self, name: &str) -> Option<u32> {
        self.attributes.get(name).copied()
    }

    pub fn has_entry_point(&self, name: &str) -> bool {
        self.entry_points.iter().any(|e| e == name)
    }
}

/// A compiled shader module and what it declares
pub struct Program {
    label: String,
    module: wgpu::ShaderModule,
    info: ProgramInfo,
}

/// Compile `source` for `device`. Parse and validation failures come back as
/// `CompileError` with the shader diagnostics in the message.
pub fn build_program(device: &wgpu::Device, label: &str, source: &str) -> Result<Program> {
    let info = ProgramInfo::reflect(label, source)?;

    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Wgsl(source.into()),
    });
    if let Some(e) = pop_validation_error(device) {
        return Err(MeldError::CompileError(format!("{}: {}", label, e)));
    }

    log::debug!(
        "built program '{}' ({} bindings, {} vertex inputs)",
        label,
        info.uniforms.len(),
        info.attributes.len()
    );
    Ok(Program {
        label: label.to_string(),
        module,
        info,
    })
}

impl Program {
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn module(&self) -> &wgpu::ShaderModule {
        &self.module
    }

    pub fn info(&self) -> &ProgramInfo {
        &self.info
    }

    pub fn get_uniform(&self, name: &str) -> Option<UniformSlot> {
        self.info.get_uniform(name)
    }

    pub fn get_attribute(&self, name: &str) -> Option<u32> {
        self.info.get_attribute(name)
    }

    /// Fail with `CompileError` unless `name` is bound at exactly `group`/`binding`
    pub fn require_uniform(&self, name: &str, group: u32, binding: u32) -> Result<()> {
        match self.get_uniform(name) {
            Some(slot) if slot == (UniformSlot { group, binding }) => Ok(()),
            Some(slot) => Err(MeldError::CompileError(format!(
                "{}: '{}' is bound at {}/{}, expected {}/{}",
                self.label, name, slot.group, slot.binding, group, binding
            ))),
            None => Err(MeldError::CompileError(format!(
                "{}: missing resource '{}'",
                self.label, name
            ))),
        }
    }

    /// Vertex attributes for the named fields the program actually reads.
    /// Fields the shader does not declare are left out.
    pub fn vertex_attributes(
        &self,
        fields: &[(&str, wgpu::VertexFormat, u64)],
    ) -> Vec<wgpu::VertexAttribute> {
        fields
            .iter()
            .filter_map(|&(name, format, offset)| {
                self.get_attribute(name).map(|shader_location| wgpu::VertexAttribute {
                    format,
                    offset,
                    shader_location,
                })
            })
            .collect()
    }
}
