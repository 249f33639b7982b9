//! HEALPix maps in FITS containers, read and written through `fitsio`.
//!
//! HEALPix maps live in the first `BINTABLE` extension, one column per
//! field (`I_STOKES`, `Q_STOKES`, ...), optionally with a repeat count
//! (`TFORMn = '1024E'`) packing several pixels per row.

use crate::domain::model::SkyMap;
use crate::healpix::{self, Ordering};
use crate::utils::error::{Result, SkyMapError};
use fitsio::hdu::{FitsHdu, HduInfo};
use fitsio::tables::{ColumnDataType, ColumnDescription, ConcreteColumnDescription};
use fitsio::FitsFile;
use std::io::ErrorKind;
use std::path::Path;

/// The first `BINTABLE` extension of an open file.
struct BinTable {
    hdu: FitsHdu,
    num_rows: usize,
    columns: Vec<ConcreteColumnDescription>,
}

fn format_error(path: &Path) -> impl Fn(fitsio::errors::Error) -> SkyMapError + '_ {
    move |e| SkyMapError::format(path, e.to_string())
}

fn read_optional_str(hdu: &FitsHdu, fptr: &mut FitsFile, key: &str) -> Option<String> {
    hdu.read_key::<String>(fptr, key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn find_bintable(fptr: &mut FitsFile, path: &Path) -> Result<BinTable> {
    let mut index: usize = 1;
    loop {
        let hdu = fptr.hdu(index).map_err(|e| {
            SkyMapError::format(path, format!("no BINTABLE extension found ({})", e))
        })?;
        let xtension = read_optional_str(&hdu, fptr, "XTENSION");
        let table = match &hdu.info {
            HduInfo::TableInfo {
                column_descriptions,
                num_rows,
            } if xtension.as_deref() == Some("BINTABLE") => {
                Some((column_descriptions.clone(), *num_rows))
            }
            _ => None,
        };
        if let Some((columns, num_rows)) = table {
            return Ok(BinTable {
                hdu,
                num_rows,
                columns,
            });
        }
        tracing::debug!(
            "Skipping {} extension",
            xtension.as_deref().unwrap_or("unknown")
        );
        index += 1;
    }
}

/// Reject tables whose declared size cannot fit in the file, before any
/// buffer is sized from the header.
fn check_table_size(path: &Path, file_len: u64, num_rows: usize, row_bytes: i64) -> Result<()> {
    let row_bytes = u64::try_from(row_bytes)
        .map_err(|_| SkyMapError::format(path, format!("NAXIS1 = {} is negative", row_bytes)))?;
    let declared = (num_rows as u64)
        .checked_mul(row_bytes)
        .ok_or_else(|| SkyMapError::format(path, "table size overflows"))?;
    if declared > file_len {
        return Err(SkyMapError::format(
            path,
            format!(
                "table declares {} rows of {} bytes but the file holds {} bytes",
                num_rows, row_bytes, file_len
            ),
        ));
    }
    Ok(())
}

/// Load one field of a HEALPix map.
///
/// `field_index` counts binary-table columns from zero; for Planck maps
/// field 0 is `I_STOKES`, the temperature.
pub fn read_healpix_map<P: AsRef<Path>>(path: P, field_index: usize) -> Result<SkyMap> {
    let path = path.as_ref();
    let file_len = std::fs::metadata(path)
        .map_err(|e| match e.kind() {
            ErrorKind::NotFound => SkyMapError::FileNotFound {
                path: path.to_path_buf(),
            },
            _ => SkyMapError::IoError(e),
        })?
        .len();

    let mut fptr = FitsFile::open(path).map_err(format_error(path))?;
    let table = find_bintable(&mut fptr, path)?;
    let fptr = &mut fptr;

    let column = table.columns.get(field_index).ok_or_else(|| {
        SkyMapError::format(
            path,
            format!(
                "field {} requested but the table has {} columns",
                field_index,
                table.columns.len()
            ),
        )
    })?;
    let colnum = field_index + 1;

    if let Some(pixtype) = read_optional_str(&table.hdu, fptr, "PIXTYPE") {
        if !pixtype.eq_ignore_ascii_case("HEALPIX") {
            return Err(SkyMapError::format(path, format!("PIXTYPE is '{}', not HEALPIX", pixtype)));
        }
    }
    if read_optional_str(&table.hdu, fptr, "INDXSCHM").as_deref() == Some("EXPLICIT")
        || read_optional_str(&table.hdu, fptr, "OBJECT").as_deref() == Some("PARTIAL")
    {
        return Err(SkyMapError::format(path, "partial-sky (explicit index) maps are not supported"));
    }

    let ordering = match read_optional_str(&table.hdu, fptr, "ORDERING") {
        Some(value) => value
            .parse::<Ordering>()
            .map_err(|e| SkyMapError::format(path, e))?,
        None => {
            tracing::warn!("⚠️ No ORDERING keyword in {}, assuming RING", path.display());
            Ordering::Ring
        }
    };

    let row_bytes = table
        .hdu
        .read_key::<i64>(fptr, "NAXIS1")
        .map_err(format_error(path))?;
    check_table_size(path, file_len, table.num_rows, row_bytes)?;

    let repeat = column.data_type.repeat.max(1);
    let npix = table
        .num_rows
        .checked_mul(repeat)
        .ok_or_else(|| SkyMapError::format(path, "pixel count overflows"))?;

    tracing::debug!(
        "Reading column {} ({} rows x {} values)",
        colnum,
        table.num_rows,
        repeat
    );

    // cfitsio applies TSCALn/TZEROn and continues into the next row once a
    // vector cell is exhausted, so one range covers every pixel
    let samples: Vec<f64> = table
        .hdu
        .read_col_range(fptr, &column.name, &(0..npix))
        .map_err(format_error(path))?;

    let nside = healpix::npix2nside(samples.len()).ok_or_else(|| {
        SkyMapError::format(path, format!("{} pixels is not 12 * nside^2", samples.len()))
    })?;
    if let Ok(header_nside) = table.hdu.read_key::<i64>(fptr, "NSIDE") {
        if header_nside != nside as i64 {
            return Err(SkyMapError::format(
                path,
                format!("NSIDE = {} but the column holds {} pixels", header_nside, npix),
            ));
        }
    }
    if !healpix::is_valid_nside(nside, ordering) {
        return Err(SkyMapError::format(
            path,
            format!("nside {} is invalid for {} ordering", nside, ordering),
        ));
    }

    let mut map = SkyMap::from_parts(samples, nside, ordering);
    map.unit = read_optional_str(&table.hdu, fptr, &format!("TUNIT{}", colnum));
    map.column_name = Some(column.name.clone()).filter(|n| !n.is_empty());
    map.coord_frame = read_optional_str(&table.hdu, fptr, "COORDSYS");

    tracing::info!(
        "📥 Loaded {} pixels (nside {}, {}) from column '{}'",
        npix,
        nside,
        ordering,
        map.column_name.as_deref().unwrap_or("?")
    );
    Ok(map)
}

/// Write `map` as a single-column HEALPix FITS table (`TFORM1 = 'D'`).
pub fn write_healpix_map<P: AsRef<Path>>(path: P, map: &SkyMap, column_name: &str) -> Result<()> {
    let path = path.as_ref();
    let write_err = |e: fitsio::errors::Error| SkyMapError::WriteError {
        path: path.to_path_buf(),
        source: std::io::Error::other(e.to_string()),
    };

    let mut fptr = FitsFile::create(path).overwrite().open().map_err(write_err)?;
    let column = ColumnDescription::new(column_name)
        .with_type(ColumnDataType::Double)
        .create()
        .map_err(write_err)?;
    let hdu = fptr
        .create_table("xtension".to_string(), &[column])
        .map_err(write_err)?;
    hdu.write_col(&mut fptr, column_name, map.samples())
        .map_err(write_err)?;

    let npix = map.npix() as i64;
    if let Some(unit) = &map.unit {
        hdu.write_key(&mut fptr, "TUNIT1", unit.as_str()).map_err(write_err)?;
    }
    hdu.write_key(&mut fptr, "PIXTYPE", "HEALPIX").map_err(write_err)?;
    hdu.write_key(&mut fptr, "ORDERING", map.ordering().to_string())
        .map_err(write_err)?;
    hdu.write_key(&mut fptr, "NSIDE", map.nside() as i64).map_err(write_err)?;
    hdu.write_key(&mut fptr, "FIRSTPIX", 0_i64).map_err(write_err)?;
    hdu.write_key(&mut fptr, "LASTPIX", npix - 1).map_err(write_err)?;
    hdu.write_key(&mut fptr, "INDXSCHM", "IMPLICIT").map_err(write_err)?;
    hdu.write_key(&mut fptr, "OBJECT", "FULLSKY").map_err(write_err)?;
    if let Some(frame) = &map.coord_frame {
        hdu.write_key(&mut fptr, "COORDSYS", frame.as_str()).map_err(write_err)?;
    }

    tracing::debug!("Wrote {} pixels to {}", npix, path.display());
    Ok(())
}
