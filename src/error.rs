use thiserror::Error;

#[derive(Error, Debug)]
pub enum PopulationError {
    #[error("Geometry error: {0}")]
    Geometry(#[from] GeometryError),

    #[error("Raster error: {0}")]
    Raster(#[from] RasterError),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeometryError {
    #[error("Failed to parse GeoJSON: {0}")]
    Parse(String),

    #[error("Unsupported GeoJSON geometry type: {0}")]
    UnsupportedType(String),

    #[error("Invalid coordinates: {0}")]
    InvalidCoordinates(String),
}

#[derive(Error, Debug)]
pub enum RasterError {
    #[error("Failed to open raster: {0}")]
    Open(String),

    #[error("Failed to read raster block: {0}")]
    Read(String),

    #[error("Invalid geotransform: {0}")]
    Transform(String),

    #[error("Unsupported raster layout: {0}")]
    Unsupported(String),
}
