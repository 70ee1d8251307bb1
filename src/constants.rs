//! Application constants for the Xaurum processor
//!
//! Header synonym tables, output column orders, default file locations and
//! the fixed parsing rules shared by the normalizers and dataset recipes.

// =============================================================================
// Directory and File Layout
// =============================================================================

/// Name of the tool directory under the user's documents folder
pub const DEFAULT_ROOT_DIR_NAME: &str = "XaurumTools";

/// Environment variable overriding the tool root
pub const ENV_ROOT: &str = "XAURUM_ROOT";

/// Environment variable overriding the input (download) directory
pub const ENV_DOWNLOAD_DIR: &str = "XAURUM_DOWNLOAD_DIR";

/// Subdirectory of the root that receives fetched exports
pub const DOWNLOAD_DIR_NAME: &str = "downloads";

/// Subdirectory of the root that receives run logs
pub const LOG_DIR_NAME: &str = "logs";

/// Master workbook carrying the Staff query, relative to the root
pub const MASTER_DIR_NAME: &str = "Master";
pub const MASTER_WORKBOOK_NAME: &str = "Converter_Xaurum.xlsm";

/// Output folders and files, relative to the parent of the root
pub const STAFF_OUTPUT: (&str, &str) = ("ReadyForFlow-Personeel", "STAFF_CompMan.xlsx");
pub const CERTIFICATES_OUTPUT: (&str, &str) = (
    "ReadyForFlow-Certificates",
    "Certificates_Overview_ready.xlsx",
);
pub const COMPETENCES_OUTPUT: (&str, &str) = (
    "ReadyForFlow-Competences",
    "Competences_Overview_ready.xlsx",
);
pub const TRAINING_OUTPUT: (&str, &str) =
    ("ReadyForFlow-Training", "Training_Req_Xaurum_ready.xlsx");
pub const CERT_RESULTS_OUTPUT: (&str, &str) = (
    "ReadyForFlow-CertResults",
    "Certification_Results_overview.xlsx",
);

/// Extensions tried for every input pattern, in this order
pub const INPUT_EXTENSIONS: &[&str] = &["xls", "xlsx"];

/// Canonical spreadsheet extension
pub const CANONICAL_EXTENSION: &str = "xlsx";

/// Worksheets holding the Staff query result, in order of preference
pub const STAFF_SHEET_NAMES: &[&str] = &["staff_compman_pq", "staff_compman", "staff"];

/// Prefix of the temporary working copy of the master workbook
pub const WORKING_COPY_PREFIX: &str = "_temp_";

// =============================================================================
// Input Patterns
// =============================================================================

pub mod patterns {
    pub const CERTIFICATES: &[&str] = &["*certificates_overview*"];
    pub const COMPETENCES: &[&str] = &["*competences_overview*"];
    pub const TRAINING: &[&str] = &["rapport_teamopleidingen*", "*training*", "rapport_leesmeldingen*"];
    pub const CERT_RESULTS: &[&str] = &["*Report_certification*", "*certification*"];
}

// =============================================================================
// Header Synonyms
// =============================================================================

/// Ordered synonym lists per logical field. Earlier entries win.
pub mod synonyms {
    pub mod staff {
        pub const GID: &[&str] = &["staffgid", "gid", "global id", "globalid"];
        pub const SAP: &[&str] = &["staffsapnr", "sapnr", "sap nr", "sap-nr", "sap"];
        pub const NAME: &[&str] = &["employee_name", "naam", "name", "personeel", "employee"];
        pub const SERVICE: &[&str] = &["service", "pool", "dienst"];
    }

    pub mod certificates {
        pub const EMPLOYEE: &[&str] = &["naam", "name", "personeel", "employee", "employee_name"];
        pub const SERVICE: &[&str] = &["service", "pool", "dienst"];
        pub const GID: &[&str] = &["group id", "staffgid", "gid", "global id", "globalid"];
        pub const SAP: &[&str] = &[
            "sap n°",
            "sap nr",
            "employee n°",
            "employee nr",
            "staffsapnr",
            "sapnr",
            "sap-nr",
            "sap",
        ];
        pub const CERT: &[&str] = &["certificaat", "certname", "certificate"];
        pub const ISSUED: &[&str] = &[
            "behaald op",
            "issued date",
            "datum behaald",
            "behaald",
            "issueddate",
        ];
        pub const EXPIRY: &[&str] = &[
            "verloopt op",
            "expiry date",
            "geldig tot",
            "expires",
            "expirydate",
        ];
        pub const FUTURE: &[&str] = &[
            "toekomstige certificaten",
            "future certificates",
            "future_certificates",
            "future",
        ];
        pub const LINK: &[&str] = &[
            "downloadlink",
            "download link",
            "druk certificaat",
            "print certificate",
            "link",
            "url",
            "program",
        ];
    }

    pub mod competences {
        pub const GID: &[&str] = &[
            "user cid",
            "staffgid",
            "gid",
            "global id",
            "globalid",
            "usercid",
        ];
        pub const SAP: &[&str] = &[
            "employee n'",
            "employee n°",
            "employee nr",
            "sap n°",
            "sap nr",
            "staffsapnr",
            "sapnr",
            "sap-nr",
            "sap",
        ];
        pub const EMPLOYEE: &[&str] = &["employee_name", "personeel", "naam", "employee"];
        pub const COMPETENCE: &[&str] = &["competence", "competentie", "skill", "vaardigheid"];
        pub const ACHIEVED: &[&str] = &["behaald op"];
        pub const VALID_UNTIL: &[&str] = &["geldig tot"];
        pub const SERVICE: &[&str] = &["service", "pool", "dienst"];
        pub const REMARK: &[&str] = &["remark"];
        pub const LINK: &[&str] = &[
            "downloadlink",
            "druk certificaat",
            "print certificate",
            "link",
            "url",
            "program",
        ];
    }

    pub mod training {
        pub const NAME: &[&str] = &["naam", "name", "employee_name", "employee", "personeel"];
        pub const GID: &[&str] = &["cid", "gid", "staffgid", "global id", "globalid", "group id"];
        pub const EMPLOYEE_NUMBER: &[&str] = &[
            "empnumber",
            "employeenumber",
            "employee number",
            "sap nr",
            "staffsapnr",
            "sapnr",
            "sap-nr",
            "sap",
            "employee n°",
            "employee nr",
        ];
        pub const SERVICE: &[&str] = &["service", "pool", "dienst"];
        pub const CERT: &[&str] = &[
            "opleiding",
            "certname",
            "certificaat",
            "certificate",
            "training",
            "opleidingstitel",
            "course name",
        ];
        pub const CATEGORY: &[&str] = &["categorie", "category", "type"];
        pub const STATUS: &[&str] = &[
            "statuut",
            "statut",
            "status",
            "state",
            "toestand",
            "inschrijvingsstatus",
            "registration status",
            "requeststatus",
        ];
        pub const DATE: &[&str] = &[
            "datum",
            "date",
            "scheduled date",
            "scheduleddate",
            "startdate",
            "start",
            "datum start",
            "start datum",
            "start time",
            "starttijd",
        ];
        pub const DURATION: &[&str] = &["duur", "duration", "durée", "lengte"];
        pub const LANGUAGE: &[&str] = &["lang", "language", "taal", "langue"];
        pub const LOCATION: &[&str] = &["location", "locatie", "lieu", "plaats"];
        pub const SITE: &[&str] = &["site", "vestiging", "standplaats"];
    }

    pub mod cert_results {
        pub const GID: &[&str] = &["gid", "staffgid", "global id", "globalid"];
        pub const NAME: &[&str] = &["naam", "name", "employee", "employee_name"];
        pub const ORGANIZER: &[&str] = &["organisator", "organizer", "organization"];
        pub const CERT: &[&str] = &["certificaat", "certname", "certificate", "certificaatnaam"];
        pub const STATUS: &[&str] = &["status", "state"];
        pub const ACHIEVED: &[&str] = &["behaald", "issued", "datum behaald", "behaald op"];
        pub const SESSION_START: &[&str] = &[
            "begin_sessie",
            "begin sessie",
            "start sessie",
            "begindatum",
        ];
        pub const SESSION_END: &[&str] = &["einde_sessie", "einde sessie", "end sessie", "einddatum"];
        pub const VALID_UNTIL: &[&str] = &[
            "geldig",
            "geldig_tot",
            "geldig tot",
            "expiry",
            "valid until",
            "geldigheidsdatum",
        ];
        pub const SERVICE: &[&str] = &["service", "dienst", "pool"];
        pub const MANAGER: &[&str] = &["manager", "verantwoordelijke"];
        pub const MANAGER_GID: &[&str] = &["mgrgid", "manager gid", "managergid"];
        pub const PROGRAM: &[&str] = &["program", "programma", "programme"];
        pub const LINK: &[&str] = &["download", "downloadlink", "download link", "link", "url"];
    }
}

// =============================================================================
// Output Columns
// =============================================================================

pub mod columns {
    /// Fields read back from the Staff output, which itself keeps every
    /// column of the master staff sheet
    pub const STAFF: &[&str] = &["staffGID", "staffSAPNR", "Employee_Name", "Service"];

    pub const CERTIFICATES: &[&str] = &[
        "Employee_Name",
        "Service",
        "staffGID",
        "staffSAP",
        "CertName",
        "IssuedDate",
        "ExpiryDate",
        "Future_Certificates",
        "DownloadLink",
    ];

    pub const COMPETENCES: &[&str] = &[
        "staffGID",
        "staffSAPNR",
        "Employee_Name",
        "CompName",
        "Achieved_On",
        "Valid_Until",
        "Service",
        "Remark",
        "Program",
    ];

    pub const TRAINING: &[&str] = &[
        "Employee_Name",
        "staffGID",
        "staffSAPNR",
        "Service",
        "CertName",
        "Categorie",
        "RequestStatus",
        "ScheduledDate",
        "Duration",
        "Language",
        "Location",
        "Site",
    ];

    pub const CERT_RESULTS: &[&str] = &[
        "staffGID",
        "staffSAPNR",
        "Naam",
        "Organisator",
        "CertName",
        "Status",
        "Behaald",
        "Begin_sessie",
        "Einde_sessie",
        "Geldig_tot",
        "Service",
        "Manager",
        "MgrGID",
        "Program",
        "DownloadLink",
    ];
}

// =============================================================================
// Field Normalization
// =============================================================================

/// Maximum number of trailing digits kept from an identifier
pub const ID_DIGITS: usize = 5;

/// Literal prefix removed from certificate names
pub const CERT_NAME_PREFIX: &str = "EQUANS_";

/// Phrases meaning "no expiry", passed through unchanged
pub const DATE_SENTINELS: &[&str] = &["n.v.t", "nvt", "onbeperkt", "unlimited"];

/// Output format of every normalized date
pub const DATE_OUTPUT_FORMAT: &str = "%Y-%m-%d";

/// Number format applied to converted date cells
pub const DATE_CELL_FORMAT: &str = "yyyy-mm-dd";

// =============================================================================
// Header Resolution
// =============================================================================

/// Column probed for a download link when no link header exists (H)
pub const LINK_FALLBACK_COLUMN: u32 = 8;

/// Columns scanned for a download link in Certification Results
pub const LINK_SCAN_COLUMNS: u32 = 19;

// =============================================================================
// Output Tables
// =============================================================================

/// Minimum populated rows (header included) before a table is added
pub const MIN_TABLE_ROWS: u32 = 2;

// =============================================================================
// External Application
// =============================================================================

/// Default headless office binary
pub const DEFAULT_OFFICE_BINARY: &str = "soffice";

/// Default bound on a single external conversion, in seconds
pub const DEFAULT_EXTERNAL_TIMEOUT_SECS: u64 = 120;

/// Poll interval while waiting on the external process, in milliseconds
pub const EXTERNAL_POLL_INTERVAL_MS: u64 = 200;
