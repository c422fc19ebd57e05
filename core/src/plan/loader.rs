use super::asset::FloorPlanSource;
use crate::device::{DeviceId, DeviceReading};
use crate::math::Vec2;
use crate::prelude::MapError;
use ini::{Ini, Properties};
use log::{debug, info};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Quality assigned to anchors whose position comes from a surveyed map.
pub const SURVEYED_QUALITY: u8 = 100;

const FLOORPLAN_SECTION: &str = "floorplan";
const DEVICES_SECTION: &str = "devices";

/// Everything a map file seeds: the anchor layout and, when present, the
/// floor plan. Both are applied to the scene together.
#[derive(Debug, Clone)]
pub struct MapBundle {
    pub devices: Vec<DeviceReading>,
    pub plan: Option<FloorPlanSource>,
}

/// Reads an INI map file. Relative image paths resolve against the map
/// file's directory.
pub fn load_map<P: AsRef<Path>>(path: P) -> Result<MapBundle, MapError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|source| MapError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    let bundle = parse_map(&contents, base_dir)?;
    info!(
        "loaded map {}: {} anchors, plan {}",
        path.display(),
        bundle.devices.len(),
        if bundle.plan.is_some() { "present" } else { "absent" }
    );
    Ok(bundle)
}

/// Parses map contents. A missing `[floorplan]` section yields no plan; a
/// present but incomplete one is an error.
pub fn parse_map(contents: &str, base_dir: &Path) -> Result<MapBundle, MapError> {
    let ini = Ini::load_from_str_noescape(contents)?;

    let plan = match ini.section(Some(FLOORPLAN_SECTION)) {
        Some(floorplan) => Some(parse_floorplan(floorplan, base_dir)?),
        None => None,
    };
    let devices = parse_anchors(&ini)?;

    Ok(MapBundle { devices, plan })
}

fn parse_floorplan(floorplan: &Properties, base_dir: &Path) -> Result<FloorPlanSource, MapError> {
    let shift_x = number::<f64>(floorplan, "shift_x_m")?;
    let shift_y = number::<f64>(floorplan, "shift_y_m")?;
    let pixels_per_meter = number::<f64>(floorplan, "scale_pixels_per_m")?;
    if !(pixels_per_meter.is_finite() && pixels_per_meter > 0.0) {
        return Err(MapError::InvalidValue {
            key: "scale_pixels_per_m".into(),
            value: pixels_per_meter.to_string(),
        });
    }

    let image_path = floorplan
        .iter()
        .find(|(key, _)| key.starts_with("Floor"))
        .map(|(_, value)| resolve(base_dir, value))
        .ok_or(MapError::MissingFloorImage)?;

    let extension = image_path
        .extension()
        .and_then(|ext| ext.to_str())
        .ok_or_else(|| MapError::MissingExtension(image_path.clone()))?
        .to_string();
    let bytes = fs::read(&image_path).map_err(|source| MapError::Io {
        path: image_path.clone(),
        source,
    })?;
    if bytes.is_empty() {
        return Err(MapError::MissingFloorImage);
    }
    debug!("floor plan {} ({} bytes)", image_path.display(), bytes.len());

    Ok(FloorPlanSource {
        origin_world: Vec2::new(shift_x, shift_y),
        pixels_per_meter,
        bytes,
        extension,
    })
}

fn parse_anchors(ini: &Ini) -> Result<Vec<DeviceReading>, MapError> {
    let enabled = ini
        .section(Some(DEVICES_SECTION))
        .ok_or_else(|| MapError::MissingSection(DEVICES_SECTION.into()))?;

    let mut devices = Vec::new();
    for (key, value) in enabled.iter() {
        let Some(index) = key.strip_prefix("beacon") else {
            continue;
        };
        if parse_value::<u32>(key, value)? != 1 {
            continue;
        }

        let section_name = format!("beacon {}", index);
        let beacon = ini
            .section(Some(section_name.as_str()))
            .ok_or_else(|| MapError::MissingSection(section_name.clone()))?;

        let mode = beacon
            .get("Hedgehog_mode")
            .ok_or_else(|| MapError::MissingValue("Hedgehog_mode".into()))?;
        if mode.trim() != "0" {
            continue;
        }

        let address = parse_value::<DeviceId>(key, index)?;
        devices.push(DeviceReading::anchor(
            address,
            number(beacon, "Position_X")?,
            number(beacon, "Position_Y")?,
            SURVEYED_QUALITY,
        ));
    }

    Ok(devices)
}

fn resolve(base_dir: &Path, value: &str) -> PathBuf {
    let path = PathBuf::from(value.trim());
    if path.is_absolute() {
        path
    } else {
        base_dir.join(path)
    }
}

fn number<T: FromStr>(section: &Properties, key: &str) -> Result<T, MapError> {
    let value = section
        .get(key)
        .ok_or_else(|| MapError::MissingValue(key.into()))?;
    parse_value(key, value)
}

fn parse_value<T: FromStr>(key: &str, value: &str) -> Result<T, MapError> {
    value.trim().parse::<T>().map_err(|_| MapError::InvalidValue {
        key: key.into(),
        value: value.into(),
    })
}
