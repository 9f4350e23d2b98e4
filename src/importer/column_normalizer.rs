// ==========================================
// 线索导入系统 - 列名归一化
// ==========================================
// 职责: 任意拼写的表头 → 标准字段名
// 规则: 表头转小写并去掉所有非字母数字字符后，与同义词表比对；
//       未命中的表头原样返回（保留未知列）
// ==========================================

use crate::domain::types::CanonicalField;

/// 同义词表（已是小写字母数字形式）
pub const COLUMN_SYNONYMS: &[(CanonicalField, &[&str])] = &[
    (CanonicalField::Email, &["email", "emailaddress", "mail"]),
    (
        CanonicalField::FirstName,
        &["firstname", "fname", "givenname", "first"],
    ),
    (
        CanonicalField::LastName,
        &["lastname", "lname", "surname", "last"],
    ),
    (
        CanonicalField::Company,
        &["company", "companyname", "organization", "org"],
    ),
    (
        CanonicalField::Title,
        &["title", "jobtitle", "position", "role"],
    ),
    (
        CanonicalField::Phone,
        &["phone", "phonenumber", "tel", "mobile"],
    ),
    (
        CanonicalField::Linkedin,
        &["linkedin", "linkedinurl", "profile"],
    ),
];

/// 比对用的键: 小写 + 仅保留字母数字
fn comparison_key(header: &str) -> String {
    header
        .chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

/// 查找表头对应的标准字段
pub fn canonical_field(header: &str) -> Option<CanonicalField> {
    let key = comparison_key(header);
    COLUMN_SYNONYMS
        .iter()
        .find(|(_, synonyms)| synonyms.contains(&key.as_str()))
        .map(|(field, _)| *field)
}

/// 归一化表头（未命中原样返回）
pub fn normalize_column_name(header: &str) -> String {
    match canonical_field(header) {
        Some(field) => field.as_str().to_string(),
        None => header.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_synonym_maps_to_canonical() {
        for (field, synonyms) in COLUMN_SYNONYMS {
            for synonym in synonyms.iter() {
                assert_eq!(normalize_column_name(synonym), field.as_str());
                assert_eq!(normalize_column_name(&synonym.to_uppercase()), field.as_str());
            }
        }
    }

    #[test]
    fn test_case_and_punctuation_variants() {
        assert_eq!(normalize_column_name("E-mail Address"), "email");
        assert_eq!(normalize_column_name("First Name"), "firstName");
        assert_eq!(normalize_column_name("first_name"), "firstName");
        assert_eq!(normalize_column_name("  LAST-NAME "), "lastName");
        assert_eq!(normalize_column_name("Company Name"), "company");
        assert_eq!(normalize_column_name("Job Title"), "title");
        assert_eq!(normalize_column_name("Phone #"), "phone");
        assert_eq!(normalize_column_name("LinkedIn URL"), "linkedin");
    }

    #[test]
    fn test_unknown_header_passes_through_verbatim() {
        assert_eq!(normalize_column_name("Favorite Color"), "Favorite Color");
        assert_eq!(normalize_column_name(" Notes "), " Notes ");
        assert_eq!(normalize_column_name(""), "");
        assert_eq!(canonical_field("Department"), None);
    }

    #[test]
    fn test_every_canonical_field_has_synonyms() {
        for field in CanonicalField::ALL {
            assert_eq!(canonical_field(field.as_str()), Some(field));
        }
    }
}
