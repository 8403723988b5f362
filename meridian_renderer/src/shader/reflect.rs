//! Resource-binding reflection from SPIR-V

use super::cache::{SPIRV_HEADER_WORDS, SPIRV_MAGIC};
use super::ShaderResource;
use crate::error::{Error, Result};
use crate::renderer::DescriptorType;

/// List every descriptor a shader declares, sorted by `(set, binding)`
pub fn reflect_resources(spirv: &[u32]) -> Result<Vec<ShaderResource>> {
    if spirv.len() < SPIRV_HEADER_WORDS || spirv[0] != SPIRV_MAGIC {
        crate::render_error!("meridian::shader", "Not a SPIR-V module ({} words)", spirv.len());
        return Err(Error::ShaderCompilationFailed("bytecode is not a SPIR-V module".to_string()));
    }
    let entry_points = spirq::ReflectConfig::new()
        .spv(spirv)
        .ref_all_rscs(true)
        .reflect()
        .map_err(|e| crate::render_err!("meridian::shader", "SPIR-V reflection failed: {:?}", e))?;

    let mut resources = Vec::new();
    for entry_point in &entry_points {
        for var in entry_point.vars.iter() {
            if let spirq::var::Variable::Descriptor { name, desc_bind, desc_ty, .. } = var {
                let resource = ShaderResource {
                    name: name.clone().unwrap_or_default(),
                    set: desc_bind.set(),
                    binding: desc_bind.bind(),
                    ty: descriptor_type(desc_ty)?,
                };
                if !resources.contains(&resource) {
                    resources.push(resource);
                }
            }
        }
    }
    resources.sort_by_key(|r| (r.set, r.binding));
    Ok(resources)
}

fn descriptor_type(desc_ty: &spirq::ty::DescriptorType) -> Result<DescriptorType> {
    use spirq::ty::DescriptorType as Spv;
    match desc_ty {
        Spv::UniformBuffer() => Ok(DescriptorType::UniformBuffer),
        Spv::StorageBuffer(..) => Ok(DescriptorType::StorageBuffer),
        Spv::Sampler() => Ok(DescriptorType::Sampler),
        Spv::SampledImage() => Ok(DescriptorType::Texture),
        Spv::CombinedImageSampler() => Ok(DescriptorType::CombinedSampler),
        other => {
            crate::render_bail!("meridian::shader", "Unsupported SPIR-V descriptor type: {:?}", other);
        }
    }
}

#[cfg(test)]
#[path = "reflect_tests.rs"]
mod tests;
