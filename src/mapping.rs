//! Column alias tables for the legacy import schemas.
//!
//! Each canonical field lists the source columns it may come from, in
//! priority order; the first non-blank value wins. A new import variant is
//! supported by adding its column name here.

use crate::geo::GeoPoint;
use crate::store::RawRow;

pub const ID: &[&str] = &[
    "id",
    "ID",
    "Id",
    "codigo",
    "CODIGO",
    "Codigo",
    "cod_prestador",
    "COD_PRESTADOR",
];

pub const PROVIDER_NAME: &[&str] = &[
    "NOMBRE_COMPLETO",
    "nombre_completo",
    "Nombre Completo",
    "Nombre",
    "nombre",
    "NOMBRE",
    "razon_social",
    "RAZON_SOCIAL",
    "Razon Social",
];

pub const SPECIALTY: &[&str] = &[
    "ESPECIALIDAD",
    "especialidad",
    "Especialidad",
    "especialidades",
    "rubro",
    "RUBRO",
];

pub const LOCALITY: &[&str] = &[
    "LOCALIDAD",
    "localidad",
    "Localidad",
    "ciudad",
    "CIUDAD",
];

pub const PROVINCE: &[&str] = &["PROVINCIA", "provincia", "Provincia", "province"];

pub const ADDRESS: &[&str] = &[
    "DIRECCION",
    "direccion",
    "Dirección",
    "Direccion",
    "domicilio",
    "DOMICILIO",
];

pub const PHONE: &[&str] = &["TELEFONO", "telefono", "Teléfono", "Telefono", "tel"];

pub const PHONE_ALT: &[&str] = &[
    "TELEFONO_2",
    "telefono_2",
    "Teléfono 2",
    "telefono_alternativo",
    "celular",
    "CELULAR",
];

pub const EMAIL: &[&str] = &["EMAIL", "email", "Email", "mail", "correo", "Correo Electrónico"];

pub const TAX_ID: &[&str] = &["CUIT", "cuit", "Cuit", "CUIL", "cuil"];

pub const LATITUDE: &[&str] = &["LATITUD", "latitud", "Latitud", "lat", "LAT", "latitude"];

pub const LONGITUDE: &[&str] = &[
    "LONGITUD",
    "longitud",
    "Longitud",
    "lng",
    "lon",
    "LNG",
    "longitude",
];

// Geographic reference table.
pub const LOCALITY_NAME: &[&str] = &["localidad", "LOCALIDAD", "Localidad", "nombre", "name"];

// Affiliate tables.
pub const DOCUMENT: &[&str] = &[
    "dni",
    "DNI",
    "numero_documento",
    "NRO_DOCUMENTO",
    "Numero de Documento",
];
pub const FULL_NAME: &[&str] = &[
    "nombre_completo",
    "NOMBRE_COMPLETO",
    "Nombre Completo",
    "apellido_nombre",
    "APELLIDO_Y_NOMBRE",
];
pub const FIRST_NAME: &[&str] = &["nombre", "NOMBRE", "Nombre", "nombres", "NOMBRES"];
pub const LAST_NAME: &[&str] = &["apellido", "APELLIDO", "Apellido", "apellidos", "APELLIDOS"];
pub const PLAN: &[&str] = &["plan", "PLAN", "Plan", "plan_codigo", "PLAN_CODIGO"];
pub const MEMBER_NUMBER: &[&str] = &[
    "numero_afiliado",
    "NRO_AFILIADO",
    "Numero de Afiliado",
    "nro_socio",
    "credencial",
];

pub fn text(row: &RawRow, aliases: &[&str]) -> Option<String> {
    row.first_of(aliases).map(str::to_string)
}

/// `None` unless both coordinates parse.
pub fn point(row: &RawRow) -> Option<GeoPoint> {
    GeoPoint::parse(row.first_of(LATITUDE)?, row.first_of(LONGITUDE)?)
}
