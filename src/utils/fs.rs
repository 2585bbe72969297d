//! IO helper: 树文档/配置的 JSON 文件读写

use std::{
    fs::File,
    io::{BufReader, BufWriter},
    path::Path,
};

use serde::{de::DeserializeOwned, Serialize};

use crate::model::arena::TreeError;

/// 从文件读取并反序列化JSON数据
pub fn read_json_file<T: DeserializeOwned>(p: &Path) -> Result<T, TreeError> {
    let f = File::open(p)?;
    let rdr = BufReader::new(f);
    let v = serde_json::from_reader(rdr)?;
    Ok(v)
}

/// 将数据保存为JSON文件（格式化输出）
pub fn write_json_file<T: Serialize>(p: &Path, value: &T) -> Result<(), TreeError> {
    let f = File::create(p)?;
    serde_json::to_writer_pretty(BufWriter::new(f), value)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use tempfile::NamedTempFile;

    #[test]
    fn test_write_then_read() {
        let file = NamedTempFile::new().unwrap();
        let value = json!({"title": "根节点", "checked": null});
        write_json_file(file.path(), &value).unwrap();

        let back: Value = read_json_file(file.path()).unwrap();
        assert_eq!(back, value);
    }

    #[test]
    fn test_read_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_json_file::<Value>(&dir.path().join("missing.json")).unwrap_err();
        assert!(matches!(err, TreeError::Io(_)));
    }

    #[test]
    fn test_read_invalid_json() {
        let file = NamedTempFile::new().unwrap();
        std::fs::write(file.path(), "{ not json").unwrap();
        let err = read_json_file::<Value>(file.path()).unwrap_err();
        assert!(matches!(err, TreeError::Parse(_)));
    }
}
