use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Gagal membaca atau menulis berkas: {0}")]
    Io(#[from] std::io::Error),

    #[error("Dokumen rusak: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{} '{}' tidak ditemukan", noun(.collection), .id)]
    NotFound { collection: &'static str, id: String },

    #[error("{0}")]
    Validation(String),

    #[error("Akses ditolak: {0}")]
    Forbidden(String),

    #[error("Anggota '{member_id}' sudah menang di grup '{group_id}' pada putaran ini")]
    AlreadyWon { member_id: String, group_id: String },

    #[error("Anggota '{member_id}' tidak terdaftar di grup '{group_id}'")]
    NotInGroup { member_id: String, group_id: String },

    #[error("Grup '{0}' belum punya anggota untuk diundi")]
    NoEligibleMembers(String),

    #[error("Pemantau berkas gagal: {0}")]
    Watch(#[from] notify::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

fn noun(collection: &str) -> &str {
    match collection {
        "member" => "Anggota",
        "group" => "Grup",
        "payment" => "Pembayaran",
        "expense" => "Pengeluaran",
        "announcement" => "Pengumuman",
        other => other,
    }
}

pub(crate) fn invalid(msg: impl Into<String>) -> Error {
    Error::Validation(msg.into())
}

pub(crate) fn not_found(collection: &'static str, id: &str) -> Error {
    Error::NotFound {
        collection,
        id: id.to_string(),
    }
}
