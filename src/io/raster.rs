use crate::types::{PixelEncoding, VerdError, VerdResult};
use gdal::raster::{Buffer, GdalType};
use gdal::{Dataset, Driver, DriverManager};
use ndarray::{Array2, Zip};
use num_traits::{Bounded, NumCast, ToPrimitive, Zero};
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// Rows evaluated and written per strip. Keeps peak memory bounded while the
/// GDAL block cache handles the actual out-of-core work.
const STRIP_ROWS: usize = 512;

struct ImageInner {
    dataset: Dataset,
    path: PathBuf,
}

/// An opened raster file with band-indexed access.
///
/// Handles are cheap to clone and shared by the expressions built from them.
/// The processing model is single-threaded, so sharing is via `Rc`.
#[derive(Clone)]
pub struct RasterImage {
    inner: Rc<ImageInner>,
}

impl RasterImage {
    /// Open a raster file with GDAL.
    pub fn open<P: AsRef<Path>>(path: P) -> VerdResult<Self> {
        log::debug!("Opening raster: {}", path.as_ref().display());
        let dataset = Dataset::open(path.as_ref())?;
        Ok(Self {
            inner: Rc::new(ImageInner {
                dataset,
                path: path.as_ref().to_path_buf(),
            }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    /// Raster dimensions as (width, height).
    pub fn size(&self) -> (usize, usize) {
        self.inner.dataset.raster_size()
    }

    pub fn band_count(&self) -> usize {
        self.inner.dataset.raster_count() as usize
    }

    /// Lazy reference to one band (0-based index).
    ///
    /// Nothing is read until the expression built from this leaf is written;
    /// the index is checked against the file when pixels are first pulled.
    pub fn band(&self, index: usize) -> RasterExpr {
        RasterExpr {
            node: Rc::new(ExprNode::Band {
                image: self.clone(),
                band: index,
            }),
        }
    }

    /// Read an entire band (0-based index) into an array of f64.
    pub fn read_band(&self, index: usize) -> VerdResult<Array2<f64>> {
        let (width, height) = self.size();
        self.read_window(index, 0, height, width)
    }

    fn dataset(&self) -> &Dataset {
        &self.inner.dataset
    }

    fn read_window(
        &self,
        band: usize,
        y_offset: usize,
        rows: usize,
        width: usize,
    ) -> VerdResult<Array2<f64>> {
        let count = self.band_count();
        if band >= count {
            return Err(VerdError::InvalidArgument(format!(
                "Band index {} out of range for {} ({} bands)",
                band,
                self.path().display(),
                count
            )));
        }
        let rasterband = self.inner.dataset.rasterband((band + 1) as isize)?;
        let buffer =
            rasterband.read_as::<f64>((0, y_offset as isize), (width, rows), (width, rows), None)?;
        Array2::from_shape_vec((rows, width), buffer.data)
            .map_err(|e| VerdError::Processing(format!("Failed to reshape band window: {}", e)))
    }
}

#[derive(Clone, Copy)]
enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Gt,
}

enum ExprNode {
    Band { image: RasterImage, band: usize },
    Constant(f64),
    Binary {
        op: BinaryOp,
        lhs: RasterExpr,
        rhs: RasterExpr,
    },
    Select {
        condition: RasterExpr,
        then_value: RasterExpr,
        otherwise: RasterExpr,
    },
}

/// A lazy pixel expression over one or more opened rasters.
///
/// Built from band leaves and constants with the usual arithmetic operators
/// plus `gt`/`select` for conditional substitution. No pixel is touched until
/// `write` evaluates the tree strip by strip and persists the result.
#[derive(Clone)]
pub struct RasterExpr {
    node: Rc<ExprNode>,
}

impl From<f64> for RasterExpr {
    fn from(value: f64) -> Self {
        RasterExpr {
            node: Rc::new(ExprNode::Constant(value)),
        }
    }
}

impl RasterExpr {
    fn binary(op: BinaryOp, lhs: RasterExpr, rhs: RasterExpr) -> RasterExpr {
        RasterExpr {
            node: Rc::new(ExprNode::Binary { op, lhs, rhs }),
        }
    }

    /// Comparison producing 1.0 where self > rhs, else 0.0.
    pub fn gt(self, rhs: impl Into<RasterExpr>) -> RasterExpr {
        RasterExpr::binary(BinaryOp::Gt, self, rhs.into())
    }

    /// Per-pixel conditional: where self is nonzero take `then_value`,
    /// elsewhere `otherwise`.
    pub fn select(
        self,
        then_value: impl Into<RasterExpr>,
        otherwise: impl Into<RasterExpr>,
    ) -> RasterExpr {
        RasterExpr {
            node: Rc::new(ExprNode::Select {
                condition: self,
                then_value: then_value.into(),
                otherwise: otherwise.into(),
            }),
        }
    }

    /// Evaluate the expression and write it to `path` with the requested
    /// pixel encoding. This is the only point at which pixels are computed.
    pub fn write<P: AsRef<Path>>(&self, path: P, encoding: PixelEncoding) -> VerdResult<()> {
        self.write_with_nodata(path, encoding, None)
    }

    /// Like `write`, additionally registering `nodata` on the output band.
    pub fn write_with_nodata<P: AsRef<Path>>(
        &self,
        path: P,
        encoding: PixelEncoding,
        nodata: Option<f64>,
    ) -> VerdResult<()> {
        write_bands(std::slice::from_ref(self), path.as_ref(), encoding, nodata)
    }

    fn collect_sources(&self, out: &mut Vec<RasterImage>) {
        match &*self.node {
            ExprNode::Band { image, .. } => out.push(image.clone()),
            ExprNode::Constant(_) => {}
            ExprNode::Binary { lhs, rhs, .. } => {
                lhs.collect_sources(out);
                rhs.collect_sources(out);
            }
            ExprNode::Select {
                condition,
                then_value,
                otherwise,
            } => {
                condition.collect_sources(out);
                then_value.collect_sources(out);
                otherwise.collect_sources(out);
            }
        }
    }

    fn evaluate(&self, y_offset: usize, rows: usize, width: usize) -> VerdResult<Array2<f64>> {
        match &*self.node {
            ExprNode::Band { image, band } => image.read_window(*band, y_offset, rows, width),
            ExprNode::Constant(value) => Ok(Array2::from_elem((rows, width), *value)),
            ExprNode::Binary { op, lhs, rhs } => {
                let left = lhs.evaluate(y_offset, rows, width)?;
                let right = rhs.evaluate(y_offset, rows, width)?;
                Ok(match op {
                    BinaryOp::Add => left + right,
                    BinaryOp::Sub => left - right,
                    BinaryOp::Mul => left * right,
                    // Division by zero keeps IEEE semantics here; the output
                    // encoding decides what a non-finite value becomes.
                    BinaryOp::Div => left / right,
                    BinaryOp::Gt => Zip::from(&left)
                        .and(&right)
                        .map_collect(|&a, &b| if a > b { 1.0 } else { 0.0 }),
                })
            }
            ExprNode::Select {
                condition,
                then_value,
                otherwise,
            } => {
                let cond = condition.evaluate(y_offset, rows, width)?;
                let then_vals = then_value.evaluate(y_offset, rows, width)?;
                let else_vals = otherwise.evaluate(y_offset, rows, width)?;
                Ok(Zip::from(&cond)
                    .and(&then_vals)
                    .and(&else_vals)
                    .map_collect(|&c, &t, &e| if c != 0.0 { t } else { e }))
            }
        }
    }
}

macro_rules! impl_expr_op {
    ($trait:ident, $method:ident, $op:expr) => {
        impl std::ops::$trait for RasterExpr {
            type Output = RasterExpr;
            fn $method(self, rhs: RasterExpr) -> RasterExpr {
                RasterExpr::binary($op, self, rhs)
            }
        }

        impl std::ops::$trait<f64> for RasterExpr {
            type Output = RasterExpr;
            fn $method(self, rhs: f64) -> RasterExpr {
                RasterExpr::binary($op, self, RasterExpr::from(rhs))
            }
        }

        impl std::ops::$trait<RasterExpr> for f64 {
            type Output = RasterExpr;
            fn $method(self, rhs: RasterExpr) -> RasterExpr {
                RasterExpr::binary($op, RasterExpr::from(self), rhs)
            }
        }
    };
}

impl_expr_op!(Add, add, BinaryOp::Add);
impl_expr_op!(Sub, sub, BinaryOp::Sub);
impl_expr_op!(Mul, mul, BinaryOp::Mul);
impl_expr_op!(Div, div, BinaryOp::Div);

/// Write several expressions as the bands of one multispectral raster.
pub fn write_multiband<P: AsRef<Path>>(
    expressions: &[RasterExpr],
    path: P,
    encoding: PixelEncoding,
) -> VerdResult<()> {
    write_bands(expressions, path.as_ref(), encoding, None)
}

fn write_bands(
    expressions: &[RasterExpr],
    path: &Path,
    encoding: PixelEncoding,
    nodata: Option<f64>,
) -> VerdResult<()> {
    if expressions.is_empty() {
        return Err(VerdError::InvalidArgument(
            "No expressions to write".to_string(),
        ));
    }

    let mut sources = Vec::new();
    for expression in expressions {
        expression.collect_sources(&mut sources);
    }
    let size = common_size(&sources)?;

    log::info!(
        "Writing {}x{} raster ({} band(s), {}) to {}",
        size.0,
        size.1,
        expressions.len(),
        encoding,
        path.display()
    );

    match encoding {
        PixelEncoding::Uint8 => {
            write_typed::<u8, _>(expressions, path, size, &sources[0], nodata, to_pixel::<u8>)
        }
        PixelEncoding::Int16 => {
            write_typed::<i16, _>(expressions, path, size, &sources[0], nodata, to_pixel::<i16>)
        }
        PixelEncoding::Float32 => write_typed::<f32, _>(
            expressions,
            path,
            size,
            &sources[0],
            nodata,
            // Non-finite values propagate unchanged into float outputs
            |value| value as f32,
        ),
    }
}

fn write_typed<T, F>(
    expressions: &[RasterExpr],
    path: &Path,
    (width, height): (usize, usize),
    reference: &RasterImage,
    nodata: Option<f64>,
    convert: F,
) -> VerdResult<()>
where
    T: GdalType + Copy,
    F: Fn(f64) -> T,
{
    let driver = driver_for_path(path)?;
    let mut dataset = driver.create_with_band_type::<T, _>(
        path,
        width as isize,
        height as isize,
        expressions.len() as isize,
    )?;

    // Carry georeferencing over from the first source image when present
    if let Ok(geo_transform) = reference.dataset().geo_transform() {
        dataset.set_geo_transform(&geo_transform)?;
    }
    let projection = reference.dataset().projection();
    if !projection.is_empty() {
        dataset.set_projection(&projection)?;
    }

    for (band_index, expression) in expressions.iter().enumerate() {
        let mut rasterband = dataset.rasterband((band_index + 1) as isize)?;
        if let Some(nodata_value) = nodata {
            rasterband.set_no_data_value(Some(nodata_value))?;
        }

        let mut y_offset = 0;
        while y_offset < height {
            let rows = STRIP_ROWS.min(height - y_offset);
            let values = expression.evaluate(y_offset, rows, width)?;
            let data: Vec<T> = values.iter().map(|&value| convert(value)).collect();
            let buffer = Buffer::new((width, rows), data);
            rasterband.write((0, y_offset as isize), (width, rows), &buffer)?;
            y_offset += rows;
        }
        log::debug!(
            "Band {}/{} written to {}",
            band_index + 1,
            expressions.len(),
            path.display()
        );
    }

    Ok(())
}

/// All source images of an expression set must agree on raster dimensions.
fn common_size(sources: &[RasterImage]) -> VerdResult<(usize, usize)> {
    let first = sources.first().ok_or_else(|| {
        VerdError::Processing("Expression references no raster bands".to_string())
    })?;
    let size = first.size();
    for source in &sources[1..] {
        if source.size() != size {
            return Err(VerdError::Processing(format!(
                "Raster size mismatch: {} is {}x{}, expected {}x{} from {}",
                source.path().display(),
                source.size().0,
                source.size().1,
                size.0,
                size.1,
                first.path().display()
            )));
        }
    }
    Ok(size)
}

/// Pick an output driver from the destination extension; GTiff when in doubt.
fn driver_for_path(path: &Path) -> VerdResult<Driver> {
    let name = match path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase())
        .as_deref()
    {
        Some("jp2") => "JP2OpenJPEG",
        Some("img") => "HFA",
        Some("vrt") => "VRT",
        _ => "GTiff",
    };
    Ok(DriverManager::get_driver_by_name(name)?)
}

/// Convert a computed f64 to an integer pixel type: saturate at the type's
/// bounds, store zero for non-finite values.
fn to_pixel<T>(value: f64) -> T
where
    T: NumCast + Bounded + ToPrimitive + Zero,
{
    if !value.is_finite() {
        return T::zero();
    }
    let low = T::min_value().to_f64().unwrap_or(f64::MIN);
    let high = T::max_value().to_f64().unwrap_or(f64::MAX);
    NumCast::from(value.clamp(low, high)).unwrap_or_else(T::zero)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_pixel_saturates() {
        assert_eq!(to_pixel::<u8>(300.0), 255);
        assert_eq!(to_pixel::<u8>(-5.0), 0);
        assert_eq!(to_pixel::<i16>(40000.0), i16::MAX);
        assert_eq!(to_pixel::<i16>(-40000.0), i16::MIN);
        assert_eq!(to_pixel::<i16>(-999.0), -999);
    }

    #[test]
    fn test_to_pixel_non_finite() {
        assert_eq!(to_pixel::<u8>(f64::NAN), 0);
        assert_eq!(to_pixel::<i16>(f64::INFINITY), 0);
        assert_eq!(to_pixel::<i16>(f64::NEG_INFINITY), 0);
    }

    #[test]
    fn test_to_pixel_truncates() {
        assert_eq!(to_pixel::<u8>(127.9), 127);
        assert_eq!(to_pixel::<i16>(-1.5), -1);
    }
}
