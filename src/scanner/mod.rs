use crate::error::{PayrollError, Result};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetFile {
    pub path: PathBuf,
    pub file_name: String,
}

impl SheetFile {
    fn new(path: &Path) -> Self {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        Self {
            path: path.to_path_buf(),
            file_name,
        }
    }
}

const SPREADSHEET_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xls", "ods"];

fn is_spreadsheet(path: &Path) -> bool {
    let is_lock_file = path
        .file_name()
        .map(|n| n.to_string_lossy().starts_with("~$"))
        .unwrap_or(false);
    if is_lock_file {
        return false;
    }
    path.extension()
        .map(|ext| {
            let ext = ext.to_string_lossy().to_lowercase();
            SPREADSHEET_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

/// 文件夹直下的表格文件（按文件名排序）
pub fn scan_folder(folder: &Path) -> Result<Vec<SheetFile>> {
    if !folder.exists() {
        return Err(PayrollError::FolderNotFound(folder.display().to_string()));
    }

    let mut files: Vec<SheetFile> = WalkDir::new(folder)
        .max_depth(1) // 只扫描直接子项
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_file() && is_spreadsheet(e.path()))
        .map(|e| SheetFile::new(e.path()))
        .collect();

    files.sort_by(|a, b| a.file_name.cmp(&b.file_name));

    Ok(files)
}

/// 命令行输入（文件或文件夹）展开为源文件列表，保持输入顺序并去重
pub fn collect_sources(inputs: &[PathBuf]) -> Result<Vec<SheetFile>> {
    let mut files: Vec<SheetFile> = Vec::new();

    for input in inputs {
        let found = if input.is_dir() {
            scan_folder(input)?
        } else if input.is_file() {
            vec![SheetFile::new(input)]
        } else {
            return Err(PayrollError::FileNotFound(input.display().to_string()));
        };

        for file in found {
            if !files.iter().any(|f| f.path == file.path) {
                files.push(file);
            }
        }
    }

    if files.is_empty() {
        let joined = inputs
            .iter()
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join(", ");
        return Err(PayrollError::NoSourceFiles(joined));
    }

    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use tempfile::tempdir;

    #[test]
    fn test_is_spreadsheet() {
        assert!(is_spreadsheet(Path::new("工资.xlsx")));
        assert!(is_spreadsheet(Path::new("工资.XLSX")));
        assert!(is_spreadsheet(Path::new("old.xls")));
        assert!(is_spreadsheet(Path::new("sheet.ods")));
        assert!(!is_spreadsheet(Path::new("rules.json")));
        assert!(!is_spreadsheet(Path::new("~$工资.xlsx")));
    }

    #[test]
    fn test_scan_folder_not_found() {
        let result = scan_folder(Path::new("/nonexistent/folder"));
        assert!(matches!(result, Err(PayrollError::FolderNotFound(_))));
    }

    #[test]
    fn test_scan_folder_sorted_and_filtered() {
        let dir = tempdir().expect("Failed to create temp dir");
        File::create(dir.path().join("c.xlsx")).unwrap();
        File::create(dir.path().join("a.xls")).unwrap();
        File::create(dir.path().join("b.XLSX")).unwrap();
        File::create(dir.path().join("readme.txt")).unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        File::create(dir.path().join("sub").join("d.xlsx")).unwrap();

        let files = scan_folder(dir.path()).unwrap();
        let names: Vec<&str> = files.iter().map(|f| f.file_name.as_str()).collect();
        assert_eq!(names, vec!["a.xls", "b.XLSX", "c.xlsx"]);
    }

    #[test]
    fn test_collect_sources_mixed_inputs() {
        let dir = tempdir().expect("Failed to create temp dir");
        let single = dir.path().join("单独.xlsx");
        File::create(&single).unwrap();
        let folder = dir.path().join("批量");
        std::fs::create_dir(&folder).unwrap();
        File::create(folder.join("1.xlsx")).unwrap();

        let files = collect_sources(&[single.clone(), folder, single]).unwrap();
        assert_eq!(files.len(), 2);
        assert_eq!(files[0].file_name, "单独.xlsx");
    }

    #[test]
    fn test_collect_sources_errors() {
        let dir = tempdir().expect("Failed to create temp dir");
        assert!(matches!(
            collect_sources(&[dir.path().to_path_buf()]),
            Err(PayrollError::NoSourceFiles(_))
        ));
        assert!(matches!(
            collect_sources(&[dir.path().join("missing.xlsx")]),
            Err(PayrollError::FileNotFound(_))
        ));
    }
}
