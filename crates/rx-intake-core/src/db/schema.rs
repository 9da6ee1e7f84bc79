//! SQLite schema definition.

/// Complete database schema for rx-intake.
pub const SCHEMA: &str = r#"
-- Enable foreign keys
PRAGMA foreign_keys = ON;

-- ============================================================================
-- Product Catalog
-- ============================================================================

CREATE TABLE IF NOT EXISTS products (
    sku TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    aliases TEXT NOT NULL DEFAULT '[]',           -- JSON array of strings
    prescription_required INTEGER NOT NULL DEFAULT 0,
    active INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- FTS5 virtual table for product name search
CREATE VIRTUAL TABLE IF NOT EXISTS products_fts USING fts5(
    sku,
    name,
    aliases,
    content='products',
    content_rowid='rowid'
);

-- Triggers to keep FTS5 in sync with main table
CREATE TRIGGER IF NOT EXISTS products_ai AFTER INSERT ON products BEGIN
    INSERT INTO products_fts(rowid, sku, name, aliases)
    VALUES (new.rowid, new.sku, new.name, new.aliases);
END;

CREATE TRIGGER IF NOT EXISTS products_ad AFTER DELETE ON products BEGIN
    INSERT INTO products_fts(products_fts, rowid, sku, name, aliases)
    VALUES ('delete', old.rowid, old.sku, old.name, old.aliases);
END;

CREATE TRIGGER IF NOT EXISTS products_au AFTER UPDATE ON products BEGIN
    INSERT INTO products_fts(products_fts, rowid, sku, name, aliases)
    VALUES ('delete', old.rowid, old.sku, old.name, old.aliases);
    INSERT INTO products_fts(rowid, sku, name, aliases)
    VALUES (new.rowid, new.sku, new.name, new.aliases);
END;

-- ============================================================================
-- Prescription Records
-- ============================================================================

CREATE TABLE IF NOT EXISTS prescriptions (
    id TEXT PRIMARY KEY,
    rx_number TEXT NOT NULL UNIQUE,
    patient_id TEXT NOT NULL,
    doctor TEXT NOT NULL,                        -- JSON DoctorInfo
    medications TEXT NOT NULL DEFAULT '[]',      -- JSON array of Medication
    diagnosis TEXT,
    symptoms TEXT NOT NULL DEFAULT '[]',         -- JSON array of strings
    allergies TEXT NOT NULL DEFAULT '[]',        -- JSON array of strings
    instructions TEXT,
    images TEXT NOT NULL DEFAULT '[]',           -- JSON array of PrescriptionImage
    extracted_text TEXT NOT NULL DEFAULT '',
    ocr_confidence INTEGER NOT NULL DEFAULT 0,
    status TEXT NOT NULL,                        -- JSON PrescriptionStatus payload
    status_kind TEXT NOT NULL,                   -- scalar tag for querying
    prescription_date TEXT NOT NULL,
    expiry_date TEXT NOT NULL,
    refills_used INTEGER NOT NULL DEFAULT 0,
    linked_orders TEXT NOT NULL DEFAULT '[]',    -- JSON array of order ids
    priority TEXT NOT NULL DEFAULT 'normal',
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_prescriptions_patient ON prescriptions(patient_id);
CREATE INDEX IF NOT EXISTS idx_prescriptions_status ON prescriptions(status_kind);
"#;
