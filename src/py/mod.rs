use pyo3::prelude::*;

mod population;

/// Register all Python-visible functions and types.
pub fn register(m: &Bound<'_, PyModule>) -> PyResult<()> {
    crate::logging::init_tracing();
    m.add_function(wrap_pyfunction!(population::calculate_population, m)?)?;
    m.add_function(wrap_pyfunction!(population::population_report, m)?)?;
    m.add_function(wrap_pyfunction!(population::population_from_array, m)?)?;
    m.add("DEFAULT_NODATA", crate::population::DEFAULT_NODATA)?;
    m.add("DEFAULT_TILE_SIZE", crate::population::DEFAULT_TILE_SIZE)?;
    Ok(())
}
