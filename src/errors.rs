use core::fmt::Display;
use core::fmt::Formatter;
use core::fmt::Result as FormatResult;
use std::error::Error;

pub(crate) use gdal::errors::GdalError;
use image::ImageError;

pub(crate) use clap::error::Error as ArgumentError;

use crate::table::ColumnType;

#[derive(Debug)]
pub(crate) enum CommandError {
    GdalError(GdalError),
    ImageError(ImageError),
    IoError(String),
    JsonError(String),
    ConfigRead(String),
    ScriptRead(String),
    ScriptEventFailed(usize,Box<CommandError>),
    InvalidGeometry(String),
    MissingSpatialReference(String),
    EmptyRasterBand(usize),
    UnknownRow(String),
    UnknownRowPosition(usize),
    UnknownColumn(String),
    EmptyColumnName,
    InvalidValueForColumn(String,ColumnType,String),
    InvalidValueForColor(String,String),
    UnknownReferenceLayer(String),
    ReferenceLayerNotVector(String),
    MissingKeyColumn(String,&'static str),
    MissingArchiveEntry(String,&'static str),
    NoVectorLayers(String),
    RasterTooLarge(usize,usize),
}

impl Error for CommandError {

}

impl Display for CommandError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FormatResult {
        match self {
            Self::GdalError(a) => write!(f,"gdal: {}",a),
            Self::ImageError(a) => write!(f,"image: {}",a),
            Self::IoError(a) => write!(f,"i/o: {}",a),
            Self::JsonError(a) => write!(f,"json: {}",a),
            Self::ConfigRead(a) => write!(f,"Error reading configuration: {}",a),
            Self::ScriptRead(a) => write!(f,"Error reading event script: {}",a),
            Self::ScriptEventFailed(a, b) => write!(f,"Event {} in the script failed: {}",a,b),
            Self::InvalidGeometry(a) => write!(f,"Could not read geometry: {}",a),
            Self::MissingSpatialReference(a) => write!(f,"Source '{}' has no spatial reference, it can't be reprojected.",a),
            Self::EmptyRasterBand(a) => write!(f,"Raster band {} could not be read.",a),
            Self::UnknownRow(a) => write!(f,"No row with id '{}' in the working table.",a),
            Self::UnknownRowPosition(a) => write!(f,"No row at position {} in the working table.",a),
            Self::UnknownColumn(a) => write!(f,"No column named '{}' in the working table.",a),
            Self::EmptyColumnName => write!(f,"A column name is required."),
            Self::InvalidValueForColumn(column, column_type, value) => write!(f,"Invalid value ('{}') for {} column '{}'.",value,column_type,column),
            Self::InvalidValueForColor(a, b) => write!(f,"Invalid value ('{}') for color: {}",a,b),
            Self::UnknownReferenceLayer(a) => write!(f,"Reference layer '{}' is not loaded.",a),
            Self::ReferenceLayerNotVector(a) => write!(f,"Reference layer '{}' is a raster and has no attributes.",a),
            Self::MissingKeyColumn(a, b) => write!(f,"Key column '{}' is missing from table {}.",a,b),
            Self::MissingArchiveEntry(a, b) => write!(f,"No {} document found inside archive '{}'.",b,a),
            Self::NoVectorLayers(a) => write!(f,"Source '{}' has no vector layers.",a),
            Self::RasterTooLarge(a, b) => write!(f,"Raster overlay of {}x{} pixels is too large to encode.",a,b),
        }
    }
}

impl From<GdalError> for CommandError {

    fn from(value: GdalError) -> Self {
        Self::GdalError(value)
    }
}

impl From<ImageError> for CommandError {

    fn from(value: ImageError) -> Self {
        Self::ImageError(value)
    }
}

impl From<std::io::Error> for CommandError {

    fn from(value: std::io::Error) -> Self {
        Self::IoError(format!("{}",value))
    }
}

impl From<serde_json::Error> for CommandError {

    fn from(value: serde_json::Error) -> Self {
        Self::JsonError(format!("{}",value))
    }
}

#[derive(Debug)]
pub(crate) enum ProgramError {
    ArgumentError(ArgumentError),
    CommandError(CommandError)
}

impl Error for ProgramError {

}

impl Display for ProgramError {

    fn fmt(&self, f: &mut Formatter<'_>) -> FormatResult {
        match self {
            Self::ArgumentError(a) => write!(f,"{}",a),
            Self::CommandError(a) => write!(f,"{}",a),
        }
    }
}

impl From<ArgumentError> for ProgramError {

    fn from(value: ArgumentError) -> Self {
        Self::ArgumentError(value)
    }
}

impl From<CommandError> for ProgramError {

    fn from(value: CommandError) -> Self {
        Self::CommandError(value)
    }
}
