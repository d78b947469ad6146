//! External collaborators: volume, transform and deformation field I/O.
//!
//! File formats are handled outside this crate. The pipeline only talks to
//! these traits; [`MemoryStore`] implements all of them in memory.

use anyhow::{anyhow, bail, Context};
use dti_core::image::ImageGeometry;
use dti_core::spatial::Point3;
use dti_core::tensor::{ComponentType, TensorImage, TensorPixel};
use dti_core::transform::{DisplacementField, PointTransform};
use nalgebra::{Matrix3, Vector3};
use std::any::Any;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

/// Free-form key/value metadata carried through unchanged.
pub type MetaDataDictionary = BTreeMap<String, String>;

/// A tensor volume as read from or written to storage.
#[derive(Debug, Clone, PartialEq)]
pub struct TensorVolume<T> {
    pub image: TensorImage<T>,
    /// Frame the tensors were measured in; `None` when the file has none.
    pub measurement_frame: Option<Matrix3<f64>>,
    pub metadata: MetaDataDictionary,
}

impl<T: TensorPixel> TensorVolume<T> {
    pub fn new(image: TensorImage<T>) -> Self {
        Self {
            image,
            measurement_frame: None,
            metadata: MetaDataDictionary::new(),
        }
    }

    pub fn with_measurement_frame(mut self, frame: Matrix3<f64>) -> Self {
        self.measurement_frame = Some(frame);
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// One entry of a transformation file.
#[derive(Debug, Clone)]
pub struct LoadedTransform {
    /// Class tag, e.g. `AffineTransform_double_3_3`.
    pub class_name: String,
    pub parameters: Vec<f64>,
    pub fixed_parameters: Vec<f64>,
    /// Point mapping for transforms that are not matrix based.
    pub mapping: Option<Arc<dyn PointTransform>>,
}

impl LoadedTransform {
    pub fn new(
        class_name: impl Into<String>,
        parameters: Vec<f64>,
        fixed_parameters: Vec<f64>,
    ) -> Self {
        Self {
            class_name: class_name.into(),
            parameters,
            fixed_parameters,
            mapping: None,
        }
    }

    /// Matrix transform from its linear part, translation and center.
    pub fn matrix_offset(
        class_name: impl Into<String>,
        matrix: &Matrix3<f64>,
        translation: &Vector3<f64>,
        center: &Point3,
    ) -> Self {
        let mut parameters: Vec<f64> = (0..3)
            .flat_map(|r| (0..3).map(move |c| (r, c)))
            .map(|(r, c)| matrix[(r, c)])
            .collect();
        parameters.extend(translation.iter());
        Self::new(class_name, parameters, center.to_array().to_vec())
    }

    /// Transform given as an arbitrary point mapping.
    pub fn with_mapping(class_name: impl Into<String>, mapping: Arc<dyn PointTransform>) -> Self {
        Self {
            class_name: class_name.into(),
            parameters: Vec::new(),
            fixed_parameters: Vec::new(),
            mapping: Some(mapping),
        }
    }
}

pub trait VolumeReader: Send + Sync {
    /// Scalar component type of the stored tensors.
    fn component_type(&self, path: &Path) -> anyhow::Result<ComponentType>;

    /// Grid of the stored volume, without reading its voxels.
    fn read_geometry(&self, path: &Path) -> anyhow::Result<ImageGeometry>;

    fn read_tensor_volume<T: TensorPixel>(&self, path: &Path) -> anyhow::Result<TensorVolume<T>>;
}

pub trait VolumeWriter: Send + Sync {
    fn write_tensor_volume<T: TensorPixel>(
        &self,
        path: &Path,
        volume: &TensorVolume<T>,
    ) -> anyhow::Result<()>;
}

pub trait TransformFileReader: Send + Sync {
    /// Entries in file order.
    fn read_transforms(&self, path: &Path) -> anyhow::Result<Vec<LoadedTransform>>;
}

pub trait DeformationFieldReader: Send + Sync {
    /// The stored vector image, as stored (displacements or positions).
    fn read_field(&self, path: &Path) -> anyhow::Result<DisplacementField>;
}

/// Borrowed set of collaborators handed to the pipeline.
pub struct Collaborators<'a, R, W, X, F> {
    pub volumes: &'a R,
    pub writer: &'a W,
    pub transforms: &'a X,
    pub fields: &'a F,
}

impl<'a, S> Collaborators<'a, S, S, S, S>
where
    S: VolumeReader + VolumeWriter + TransformFileReader + DeformationFieldReader,
{
    /// One object serving every role.
    pub fn uniform(store: &'a S) -> Self {
        Self {
            volumes: store,
            writer: store,
            transforms: store,
            fields: store,
        }
    }
}

struct StoredVolume {
    component_type: ComponentType,
    geometry: ImageGeometry,
    volume: Arc<dyn Any + Send + Sync>,
}

/// In-memory collaborator keyed by path.
#[derive(Default)]
pub struct MemoryStore {
    volumes: RwLock<HashMap<PathBuf, StoredVolume>>,
    transforms: RwLock<HashMap<PathBuf, Vec<LoadedTransform>>>,
    fields: RwLock<HashMap<PathBuf, DisplacementField>>,
}

fn poisoned<E>(_: E) -> anyhow::Error {
    anyhow!("memory store lock poisoned")
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_volume<T: TensorPixel>(
        &self,
        path: impl Into<PathBuf>,
        volume: TensorVolume<T>,
    ) -> anyhow::Result<()> {
        let stored = StoredVolume {
            component_type: T::COMPONENT_TYPE,
            geometry: volume.image.geometry().clone(),
            volume: Arc::new(volume),
        };
        self.volumes.write().map_err(poisoned)?.insert(path.into(), stored);
        Ok(())
    }

    pub fn insert_transforms(
        &self,
        path: impl Into<PathBuf>,
        transforms: Vec<LoadedTransform>,
    ) -> anyhow::Result<()> {
        self.transforms.write().map_err(poisoned)?.insert(path.into(), transforms);
        Ok(())
    }

    pub fn insert_field(
        &self,
        path: impl Into<PathBuf>,
        field: DisplacementField,
    ) -> anyhow::Result<()> {
        self.fields.write().map_err(poisoned)?.insert(path.into(), field);
        Ok(())
    }

    pub fn contains_volume(&self, path: impl AsRef<Path>) -> bool {
        self.volumes
            .read()
            .map(|volumes| volumes.contains_key(path.as_ref()))
            .unwrap_or(false)
    }

    /// Stored volume of component type `T`, if any.
    pub fn volume<T: TensorPixel>(&self, path: impl AsRef<Path>) -> Option<TensorVolume<T>> {
        self.read_tensor_volume(path.as_ref()).ok()
    }
}

impl VolumeReader for MemoryStore {
    fn component_type(&self, path: &Path) -> anyhow::Result<ComponentType> {
        let volumes = self.volumes.read().map_err(poisoned)?;
        let stored = volumes
            .get(path)
            .with_context(|| format!("no volume stored at {}", path.display()))?;
        Ok(stored.component_type)
    }

    fn read_geometry(&self, path: &Path) -> anyhow::Result<ImageGeometry> {
        let volumes = self.volumes.read().map_err(poisoned)?;
        let stored = volumes
            .get(path)
            .with_context(|| format!("no volume stored at {}", path.display()))?;
        Ok(stored.geometry.clone())
    }

    fn read_tensor_volume<T: TensorPixel>(&self, path: &Path) -> anyhow::Result<TensorVolume<T>> {
        let volumes = self.volumes.read().map_err(poisoned)?;
        let stored = volumes
            .get(path)
            .with_context(|| format!("no volume stored at {}", path.display()))?;
        match stored.volume.downcast_ref::<TensorVolume<T>>() {
            Some(volume) => Ok(volume.clone()),
            None => bail!(
                "volume at {} has component type {}, not {}",
                path.display(),
                stored.component_type,
                T::COMPONENT_TYPE
            ),
        }
    }
}

impl VolumeWriter for MemoryStore {
    fn write_tensor_volume<T: TensorPixel>(
        &self,
        path: &Path,
        volume: &TensorVolume<T>,
    ) -> anyhow::Result<()> {
        self.insert_volume(path, volume.clone())
    }
}

impl TransformFileReader for MemoryStore {
    fn read_transforms(&self, path: &Path) -> anyhow::Result<Vec<LoadedTransform>> {
        let transforms = self.transforms.read().map_err(poisoned)?;
        transforms
            .get(path)
            .cloned()
            .with_context(|| format!("no transformation file stored at {}", path.display()))
    }
}

impl DeformationFieldReader for MemoryStore {
    fn read_field(&self, path: &Path) -> anyhow::Result<DisplacementField> {
        let fields = self.fields.read().map_err(poisoned)?;
        fields
            .get(path)
            .cloned()
            .with_context(|| format!("no deformation field stored at {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dti_core::image::Image;
    use dti_core::tensor::DiffusionTensor;

    fn small_volume() -> TensorVolume<i16> {
        let image = Image::filled(
            ImageGeometry::with_size([2, 2, 2]),
            DiffusionTensor::new([1, 0, 0, 1, 0, 1]),
        );
        TensorVolume::new(image).with_metadata("modality", "DWMRI")
    }

    #[test]
    fn test_volume_round_trip() {
        let store = MemoryStore::new();
        store.insert_volume("a.nrrd", small_volume()).unwrap();
        assert_eq!(store.component_type(Path::new("a.nrrd")).unwrap(), ComponentType::I16);
        assert_eq!(store.read_geometry(Path::new("a.nrrd")).unwrap().size(), [2, 2, 2]);
        let back: TensorVolume<i16> = store.read_tensor_volume(Path::new("a.nrrd")).unwrap();
        assert_eq!(back, small_volume());
    }

    #[test]
    fn test_wrong_component_type_is_error() {
        let store = MemoryStore::new();
        store.insert_volume("a.nrrd", small_volume()).unwrap();
        let err = store.read_tensor_volume::<f32>(Path::new("a.nrrd")).unwrap_err();
        assert!(err.to_string().contains("short"));
        assert!(store.volume::<f32>("a.nrrd").is_none());
    }

    #[test]
    fn test_missing_entries() {
        let store = MemoryStore::new();
        assert!(!store.contains_volume("missing.nrrd"));
        assert!(store.read_transforms(Path::new("t.tfm")).is_err());
        assert!(store.read_field(Path::new("f.nrrd")).is_err());
    }

    #[test]
    fn test_matrix_offset_parameters() {
        let m = Matrix3::new(1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0);
        let t = LoadedTransform::matrix_offset(
            "AffineTransform_double_3_3",
            &m,
            &Vector3::new(10.0, 11.0, 12.0),
            &Point3::new([0.5, 0.5, 0.5]),
        );
        let expected: Vec<f64> = (1..=12).map(f64::from).collect();
        assert_eq!(t.parameters, expected);
        assert_eq!(t.fixed_parameters, vec![0.5, 0.5, 0.5]);
        assert!(t.mapping.is_none());
    }
}
