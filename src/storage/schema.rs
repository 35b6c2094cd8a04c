//! Declarative table definitions for the H@H catalog database, leaves first.
//!
//! Uses the teacher's `Table`/`Column`/`sqlite_column!` DDL generator
//! (`crate::sqlite_persistence`) so every table gets the same
//! create-then-validate treatment the teacher applies to its Spotify schema.

use crate::sqlite_column;
use crate::sqlite_persistence::{Column, ForeignKey, ForeignKeyOnChange, SqlType, Table, VersionedSchema};

const CASCADE_GALLERY_FK: ForeignKey = ForeignKey {
    foreign_table: "galleries_dbids",
    foreign_column: "db_gallery_id",
    on_delete: ForeignKeyOnChange::Cascade,
};

const CASCADE_FILE_FK: ForeignKey = ForeignKey {
    foreign_table: "files_dbids",
    foreign_column: "db_file_id",
    on_delete: ForeignKeyOnChange::Cascade,
};

// =============================================================================
// Galleries — the natural-key <-> surrogate-key mapping (I1)
// =============================================================================

pub const GALLERIES_DBIDS_TABLE: Table = Table {
    name: "galleries_dbids",
    columns: &[
        sqlite_column!("db_gallery_id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("gallery_name_part1", &SqlType::Text, non_null = true),
        sqlite_column!("gallery_name_part2", &SqlType::Text, non_null = true),
        sqlite_column!("gallery_name_full", &SqlType::Text, non_null = true),
    ],
    indices: &[("idx_galleries_dbids_full", "gallery_name_full")],
    unique_constraints: &[&["gallery_name_part1", "gallery_name_part2"]],
};

// =============================================================================
// Per-attribute gallery tables (I3)
// =============================================================================

pub const GIDS_TABLE: Table = Table {
    name: "gids",
    columns: &[
        sqlite_column!(
            "db_gallery_id",
            &SqlType::Integer,
            is_primary_key = true,
            foreign_key = Some(&CASCADE_GALLERY_FK)
        ),
        sqlite_column!("gid", &SqlType::Integer, non_null = true),
    ],
    indices: &[("idx_gids_gid", "gid")],
    unique_constraints: &[&["gid"]],
};

pub const TITLES_TABLE: Table = Table {
    name: "titles",
    columns: &[
        sqlite_column!(
            "db_gallery_id",
            &SqlType::Integer,
            is_primary_key = true,
            foreign_key = Some(&CASCADE_GALLERY_FK)
        ),
        sqlite_column!("title", &SqlType::Text, non_null = true),
    ],
    indices: &[],
    unique_constraints: &[],
};

pub const UPLOAD_ACCOUNTS_TABLE: Table = Table {
    name: "upload_accounts",
    columns: &[
        sqlite_column!(
            "db_gallery_id",
            &SqlType::Integer,
            is_primary_key = true,
            foreign_key = Some(&CASCADE_GALLERY_FK)
        ),
        sqlite_column!("upload_account", &SqlType::Text, non_null = true),
    ],
    indices: &[("idx_upload_accounts_account", "upload_account")],
    unique_constraints: &[],
};

/// Only populated when the comment is non-empty (I4).
pub const GALLERIES_COMMENTS_TABLE: Table = Table {
    name: "galleries_comments",
    columns: &[
        sqlite_column!(
            "db_gallery_id",
            &SqlType::Integer,
            is_primary_key = true,
            foreign_key = Some(&CASCADE_GALLERY_FK)
        ),
        sqlite_column!("comment", &SqlType::Text, non_null = true),
    ],
    indices: &[],
    unique_constraints: &[],
};

macro_rules! time_table {
    ($konst:ident, $table_name:literal) => {
        pub const $konst: Table = Table {
            name: $table_name,
            columns: &[
                sqlite_column!(
                    "db_gallery_id",
                    &SqlType::Integer,
                    is_primary_key = true,
                    foreign_key = Some(&CASCADE_GALLERY_FK)
                ),
                sqlite_column!("time", &SqlType::Text, non_null = true),
            ],
            indices: &[],
            unique_constraints: &[],
        };
    };
}

time_table!(UPLOAD_TIMES_TABLE, "upload_times");
time_table!(DOWNLOAD_TIMES_TABLE, "download_times");
time_table!(MODIFIED_TIMES_TABLE, "modified_times");
time_table!(ACCESS_TIMES_TABLE, "access_times");
time_table!(REDOWNLOAD_TIMES_TABLE, "redownload_times");

// =============================================================================
// Files (I2)
// =============================================================================

pub const FILES_DBIDS_TABLE: Table = Table {
    name: "files_dbids",
    columns: &[
        sqlite_column!("db_file_id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!(
            "db_gallery_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&CASCADE_GALLERY_FK)
        ),
        sqlite_column!("file_name_part1", &SqlType::Text, non_null = true),
        sqlite_column!("file_name_part2", &SqlType::Text, non_null = true),
    ],
    indices: &[("idx_files_dbids_gallery", "db_gallery_id")],
    unique_constraints: &[&["db_gallery_id", "file_name_part1", "file_name_part2"]],
};

pub const FILES_NAMES_TABLE: Table = Table {
    name: "files_names",
    columns: &[
        sqlite_column!(
            "db_file_id",
            &SqlType::Integer,
            is_primary_key = true,
            foreign_key = Some(&CASCADE_FILE_FK)
        ),
        sqlite_column!("full_name", &SqlType::Text, non_null = true),
    ],
    indices: &[("idx_files_names_full", "full_name")],
    unique_constraints: &[],
};

// =============================================================================
// Hash store (C5) — one dictionary + mapping table pair per algorithm.
// All 11 are preserved per the design's open question; only sha512
// participates in duplicate detection, the rest exist for lookup.
// =============================================================================

macro_rules! hash_tables {
    ($dict_konst:ident, $map_konst:ident, $dict_name:literal, $map_name:literal, $map_idx:literal) => {
        pub const $dict_konst: Table = Table {
            name: $dict_name,
            columns: &[
                sqlite_column!("db_hash_id", &SqlType::Integer, is_primary_key = true),
                sqlite_column!("hash_value", &SqlType::Blob, non_null = true),
            ],
            indices: &[],
            unique_constraints: &[&["hash_value"]],
        };

        pub const $map_konst: Table = Table {
            name: $map_name,
            columns: &[
                sqlite_column!(
                    "db_file_id",
                    &SqlType::Integer,
                    is_primary_key = true,
                    foreign_key = Some(&CASCADE_FILE_FK)
                ),
                sqlite_column!("db_hash_id", &SqlType::Integer, non_null = true),
            ],
            indices: &[($map_idx, "db_hash_id")],
            unique_constraints: &[],
        };
    };
}

hash_tables!(
    SHA1_DICT_TABLE,
    SHA1_MAP_TABLE,
    "files_hashs_sha1_dbids",
    "files_hashs_sha1",
    "idx_files_hashs_sha1_hash"
);
hash_tables!(
    SHA224_DICT_TABLE,
    SHA224_MAP_TABLE,
    "files_hashs_sha224_dbids",
    "files_hashs_sha224",
    "idx_files_hashs_sha224_hash"
);
hash_tables!(
    SHA256_DICT_TABLE,
    SHA256_MAP_TABLE,
    "files_hashs_sha256_dbids",
    "files_hashs_sha256",
    "idx_files_hashs_sha256_hash"
);
hash_tables!(
    SHA384_DICT_TABLE,
    SHA384_MAP_TABLE,
    "files_hashs_sha384_dbids",
    "files_hashs_sha384",
    "idx_files_hashs_sha384_hash"
);
hash_tables!(
    SHA512_DICT_TABLE,
    SHA512_MAP_TABLE,
    "files_hashs_sha512_dbids",
    "files_hashs_sha512",
    "idx_files_hashs_sha512_hash"
);
hash_tables!(
    SHA3_224_DICT_TABLE,
    SHA3_224_MAP_TABLE,
    "files_hashs_sha3_224_dbids",
    "files_hashs_sha3_224",
    "idx_files_hashs_sha3_224_hash"
);
hash_tables!(
    SHA3_256_DICT_TABLE,
    SHA3_256_MAP_TABLE,
    "files_hashs_sha3_256_dbids",
    "files_hashs_sha3_256",
    "idx_files_hashs_sha3_256_hash"
);
hash_tables!(
    SHA3_384_DICT_TABLE,
    SHA3_384_MAP_TABLE,
    "files_hashs_sha3_384_dbids",
    "files_hashs_sha3_384",
    "idx_files_hashs_sha3_384_hash"
);
hash_tables!(
    SHA3_512_DICT_TABLE,
    SHA3_512_MAP_TABLE,
    "files_hashs_sha3_512_dbids",
    "files_hashs_sha3_512",
    "idx_files_hashs_sha3_512_hash"
);
hash_tables!(
    BLAKE2B_DICT_TABLE,
    BLAKE2B_MAP_TABLE,
    "files_hashs_blake2b_dbids",
    "files_hashs_blake2b",
    "idx_files_hashs_blake2b_hash"
);
hash_tables!(
    BLAKE2S_DICT_TABLE,
    BLAKE2S_MAP_TABLE,
    "files_hashs_blake2s_dbids",
    "files_hashs_blake2s",
    "idx_files_hashs_blake2s_hash"
);

// =============================================================================
// Tags
// =============================================================================

pub const TAG_NAMES_TABLE: Table = Table {
    name: "tag_names",
    columns: &[
        sqlite_column!("db_tag_name_id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("name", &SqlType::Text, non_null = true),
    ],
    indices: &[],
    unique_constraints: &[&["name"]],
};

pub const TAG_VALUES_TABLE: Table = Table {
    name: "tag_values",
    columns: &[
        sqlite_column!("db_tag_value_id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("value", &SqlType::Text, non_null = true),
    ],
    indices: &[],
    unique_constraints: &[&["value"]],
};

const TAG_NAME_FK: ForeignKey = ForeignKey {
    foreign_table: "tag_names",
    foreign_column: "db_tag_name_id",
    on_delete: ForeignKeyOnChange::Restrict,
};

const TAG_VALUE_FK: ForeignKey = ForeignKey {
    foreign_table: "tag_values",
    foreign_column: "db_tag_value_id",
    on_delete: ForeignKeyOnChange::Restrict,
};

pub const TAG_PAIRS_TABLE: Table = Table {
    name: "tag_pairs",
    columns: &[
        sqlite_column!("db_tag_pair_id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!(
            "db_tag_name_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&TAG_NAME_FK)
        ),
        sqlite_column!(
            "db_tag_value_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&TAG_VALUE_FK)
        ),
    ],
    indices: &[],
    unique_constraints: &[&["db_tag_name_id", "db_tag_value_id"]],
};

const TAG_PAIR_FK: ForeignKey = ForeignKey {
    foreign_table: "tag_pairs",
    foreign_column: "db_tag_pair_id",
    on_delete: ForeignKeyOnChange::Cascade,
};

pub const GALLERY_TAGS_TABLE: Table = Table {
    name: "gallery_tags",
    columns: &[
        sqlite_column!(
            "db_gallery_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&CASCADE_GALLERY_FK)
        ),
        sqlite_column!(
            "db_tag_pair_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&TAG_PAIR_FK)
        ),
    ],
    indices: &[("idx_gallery_tags_pair", "db_tag_pair_id")],
    unique_constraints: &[&["db_gallery_id", "db_tag_pair_id"]],
};

// =============================================================================
// Gid queues
// =============================================================================

pub const REMOVED_GALLERIES_GIDS_TABLE: Table = Table {
    name: "removed_galleries_gids",
    columns: &[sqlite_column!("gid", &SqlType::Integer, is_primary_key = true)],
    indices: &[],
    unique_constraints: &[],
};

pub const TODELETE_GIDS_TABLE: Table = Table {
    name: "todelete_gids",
    columns: &[sqlite_column!("gid", &SqlType::Integer, is_primary_key = true)],
    indices: &[],
    unique_constraints: &[],
};

pub const TODOWNLOAD_GIDS_TABLE: Table = Table {
    name: "todownload_gids",
    columns: &[
        sqlite_column!("gid", &SqlType::Integer, is_primary_key = true),
        sqlite_column!(
            "url",
            &SqlType::Text,
            non_null = true,
            default_value = Some("''")
        ),
    ],
    indices: &[],
    unique_constraints: &[],
};

/// Tombstone table: a gallery name present here has an ingest in flight or
/// interrupted (I6).
pub const PENDING_GALLERY_REMOVALS_TABLE: Table = Table {
    name: "pending_gallery_removals",
    columns: &[sqlite_column!(
        "gallery_name",
        &SqlType::Text,
        is_primary_key = true
    )],
    indices: &[],
    unique_constraints: &[],
};

pub const ALL_TABLES: &[Table] = &[
    GALLERIES_DBIDS_TABLE,
    GIDS_TABLE,
    TITLES_TABLE,
    UPLOAD_ACCOUNTS_TABLE,
    GALLERIES_COMMENTS_TABLE,
    UPLOAD_TIMES_TABLE,
    DOWNLOAD_TIMES_TABLE,
    MODIFIED_TIMES_TABLE,
    ACCESS_TIMES_TABLE,
    REDOWNLOAD_TIMES_TABLE,
    FILES_DBIDS_TABLE,
    FILES_NAMES_TABLE,
    SHA1_DICT_TABLE,
    SHA1_MAP_TABLE,
    SHA224_DICT_TABLE,
    SHA224_MAP_TABLE,
    SHA256_DICT_TABLE,
    SHA256_MAP_TABLE,
    SHA384_DICT_TABLE,
    SHA384_MAP_TABLE,
    SHA512_DICT_TABLE,
    SHA512_MAP_TABLE,
    SHA3_224_DICT_TABLE,
    SHA3_224_MAP_TABLE,
    SHA3_256_DICT_TABLE,
    SHA3_256_MAP_TABLE,
    SHA3_384_DICT_TABLE,
    SHA3_384_MAP_TABLE,
    SHA3_512_DICT_TABLE,
    SHA3_512_MAP_TABLE,
    BLAKE2B_DICT_TABLE,
    BLAKE2B_MAP_TABLE,
    BLAKE2S_DICT_TABLE,
    BLAKE2S_MAP_TABLE,
    TAG_NAMES_TABLE,
    TAG_VALUES_TABLE,
    TAG_PAIRS_TABLE,
    GALLERY_TAGS_TABLE,
    REMOVED_GALLERIES_GIDS_TABLE,
    TODELETE_GIDS_TABLE,
    TODOWNLOAD_GIDS_TABLE,
    PENDING_GALLERY_REMOVALS_TABLE,
];

/// Single version so far; `migration` is `None` because the schema has
/// never shipped a prior shape. Future column additions get a new entry
/// here plus a `migration` function, following the teacher's
/// `CATALOG_VERSIONED_SCHEMAS` pattern.
pub const MAIN_SCHEMA: VersionedSchema = VersionedSchema {
    version: 1,
    tables: ALL_TABLES,
    migration: None,
};

/// Pure-SQL views with no code-side logic, created after the tables above.
pub const VIEWS_SQL: &[(&str, &str)] = &[
    (
        "galleries_infos",
        "CREATE VIEW IF NOT EXISTS galleries_infos AS
         SELECT g.db_gallery_id, g.gallery_name_full AS gallery_name,
                gi.gid, t.title, ua.upload_account,
                COALESCE(c.comment, '') AS comment,
                ut.time AS upload_time, dt.time AS download_time,
                mt.time AS modified_time, at.time AS access_time,
                rt.time AS redownload_time
         FROM galleries_dbids g
         JOIN gids gi ON gi.db_gallery_id = g.db_gallery_id
         JOIN titles t ON t.db_gallery_id = g.db_gallery_id
         JOIN upload_accounts ua ON ua.db_gallery_id = g.db_gallery_id
         LEFT JOIN galleries_comments c ON c.db_gallery_id = g.db_gallery_id
         JOIN upload_times ut ON ut.db_gallery_id = g.db_gallery_id
         JOIN download_times dt ON dt.db_gallery_id = g.db_gallery_id
         JOIN modified_times mt ON mt.db_gallery_id = g.db_gallery_id
         JOIN access_times at ON at.db_gallery_id = g.db_gallery_id
         JOIN redownload_times rt ON rt.db_gallery_id = g.db_gallery_id",
    ),
    (
        "files_hashs_sha512",
        "CREATE VIEW IF NOT EXISTS files_hashs_sha512 AS
         SELECT m.db_file_id, d.hash_value
         FROM files_hashs_sha512 m
         JOIN files_hashs_sha512_dbids d ON d.db_hash_id = m.db_hash_id",
    ),
    (
        "duplicated_files_hashs_sha512",
        "CREATE VIEW IF NOT EXISTS duplicated_files_hashs_sha512 AS
         SELECT m.db_hash_id, d.hash_value, COUNT(*) AS file_count
         FROM files_hashs_sha512 m
         JOIN files_hashs_sha512_dbids d ON d.db_hash_id = m.db_hash_id
         GROUP BY m.db_hash_id
         HAVING COUNT(*) >= 3",
    ),
    (
        "duplicate_hash_in_gallery",
        "CREATE VIEW IF NOT EXISTS duplicate_hash_in_gallery AS
         SELECT f.db_gallery_id,
                COUNT(DISTINCT CASE WHEN dup.db_hash_id IS NOT NULL THEN m.db_hash_id END) AS dup_hash_count,
                COUNT(DISTINCT m.db_hash_id) AS total_hash_count
         FROM files_dbids f
         JOIN files_hashs_sha512 m ON m.db_file_id = f.db_file_id
         LEFT JOIN duplicated_files_hashs_sha512 dup ON dup.db_hash_id = m.db_hash_id
         GROUP BY f.db_gallery_id
         HAVING total_hash_count > 0
            AND CAST(dup_hash_count AS REAL) / total_hash_count >= 0.9",
    ),
    (
        "duplicated_hash_values_by_count_artist_ratio",
        "CREATE VIEW IF NOT EXISTS duplicated_hash_values_by_count_artist_ratio AS
         WITH hash_artists AS (
             SELECT dup.db_hash_id, dup.hash_value, tv.value AS artist
             FROM duplicated_files_hashs_sha512 dup
             JOIN files_hashs_sha512 m ON m.db_hash_id = dup.db_hash_id
             JOIN files_dbids f ON f.db_file_id = m.db_file_id
             JOIN gallery_tags gt ON gt.db_gallery_id = f.db_gallery_id
             JOIN tag_pairs tp ON tp.db_tag_pair_id = gt.db_tag_pair_id
             JOIN tag_names tn ON tn.db_tag_name_id = tp.db_tag_name_id AND tn.name = 'artist'
             JOIN tag_values tv ON tv.db_tag_value_id = tp.db_tag_value_id
         ),
         hash_artist_counts AS (
             SELECT db_hash_id, hash_value, COUNT(DISTINCT artist) AS distinct_artists
             FROM hash_artists
             GROUP BY db_hash_id
         ),
         gallery_artist_counts AS (
             SELECT f.db_gallery_id, COUNT(DISTINCT tv.value) AS artist_count
             FROM files_dbids f
             JOIN gallery_tags gt ON gt.db_gallery_id = f.db_gallery_id
             JOIN tag_pairs tp ON tp.db_tag_pair_id = gt.db_tag_pair_id
             JOIN tag_names tn ON tn.db_tag_name_id = tp.db_tag_name_id AND tn.name = 'artist'
             JOIN tag_values tv ON tv.db_tag_value_id = tp.db_tag_value_id
             GROUP BY f.db_gallery_id
         ),
         hash_galleries AS (
             SELECT DISTINCT dup.db_hash_id, f.db_gallery_id
             FROM duplicated_files_hashs_sha512 dup
             JOIN files_hashs_sha512 m ON m.db_hash_id = dup.db_hash_id
             JOIN files_dbids f ON f.db_file_id = m.db_file_id
         ),
         hash_max_artists AS (
             SELECT hg.db_hash_id, MAX(gac.artist_count) AS max_artist_count
             FROM hash_galleries hg
             JOIN gallery_artist_counts gac ON gac.db_gallery_id = hg.db_gallery_id
             GROUP BY hg.db_hash_id
         )
         SELECT hac.db_hash_id, hac.hash_value, hac.distinct_artists
         FROM hash_artist_counts hac
         JOIN hash_max_artists hma ON hma.db_hash_id = hac.db_hash_id
         WHERE hma.max_artist_count > 0
           AND CAST(hac.distinct_artists AS REAL) / hma.max_artist_count > 2.0",
    ),
    (
        "pending_download_gids",
        "CREATE VIEW IF NOT EXISTS pending_download_gids AS
         SELECT gi.gid
         FROM galleries_infos gi
         WHERE datetime(gi.redownload_time, '+7 days') <= datetime('now', 'localtime')
           AND datetime(gi.upload_time, '+7 days') <= datetime('now', 'localtime')
           AND datetime(gi.redownload_time) <= datetime(gi.upload_time, '+1 year')
           AND (
               datetime(gi.download_time, '+7 days') <= datetime('now', 'localtime')
               OR datetime(gi.download_time, '+7 days') <= datetime(gi.redownload_time)
           )
         ORDER BY gi.upload_time DESC",
    ),
    (
        "todelete_names",
        "CREATE VIEW IF NOT EXISTS todelete_names AS
         SELECT g.gallery_name_full AS gallery_name, td.gid
         FROM todelete_gids td
         JOIN gids gi ON gi.gid = td.gid
         JOIN galleries_dbids g ON g.db_gallery_id = gi.db_gallery_id",
    ),
];
