// ==========================================
// Wortmann CSV 导入系统 - 字节解码器
// ==========================================
// 依据: Wortmann 导出工具固定使用 cp1252 (windows-1252)
// 职责: 字节流 → 文本，严格模式
// 红线: 不做替换、不丢字节——财务数据依赖精确字符（€、ä、ö、ü）
// ==========================================

use crate::importer::error::{ImportError, ImportResult};
use encoding_rs::{Encoding, WINDOWS_1252};

/// 厂商默认编码标签
pub const DEFAULT_ENCODING: &str = "cp1252";

/// cp1252 中未定义的五个字节。
/// WHATWG 规范将其映射为 C1 控制符，这里严格拒绝：
/// 出现即说明文件不是真正的 cp1252 导出。
const CP1252_UNASSIGNED: [u8; 5] = [0x81, 0x8D, 0x8F, 0x90, 0x9D];

pub struct ByteDecoder;

impl ByteDecoder {
    /// 按声明编码解码字节流
    ///
    /// # 参数
    /// - bytes: 原始字节
    /// - encoding_name: 编码标签（如 "cp1252" / "windows-1252"）
    ///
    /// # 返回
    /// - Ok(String): 解码后的完整文本
    /// - Err(DecodeError): 首个无映射字节的偏移与值
    /// - Err(UnknownEncoding): 标签无法解析
    pub fn decode(&self, bytes: &[u8], encoding_name: &str) -> ImportResult<String> {
        let encoding = Encoding::for_label(encoding_name.trim().as_bytes())
            .ok_or_else(|| ImportError::UnknownEncoding(encoding_name.to_string()))?;

        // windows-1252 对全部 256 个字节都有 WHATWG 映射，
        // 未定义字节需要显式扫描才能精确报错
        if encoding == WINDOWS_1252 {
            if let Some(offset) = bytes
                .iter()
                .position(|b| CP1252_UNASSIGNED.contains(b))
            {
                return Err(ImportError::DecodeError {
                    offset,
                    byte: bytes[offset],
                    encoding: encoding_name.to_string(),
                });
            }
        }

        match encoding.decode_without_bom_handling_and_without_replacement(bytes) {
            Some(text) => Ok(text.into_owned()),
            None => {
                // 多字节编码的畸形序列：定位首个坏字节以便诊断
                let offset = first_undecodable_offset(encoding, bytes);
                Err(ImportError::DecodeError {
                    offset,
                    byte: bytes.get(offset).copied().unwrap_or(0),
                    encoding: encoding_name.to_string(),
                })
            }
        }
    }

    /// 将文本编码回 cp1252（解码完整性校验用）
    ///
    /// # 返回
    /// - Ok(Vec<u8>): 编码后的字节
    /// - Err: 文本包含 cp1252 无法表示的字符
    pub fn encode_cp1252(&self, text: &str) -> ImportResult<Vec<u8>> {
        let (bytes, _, had_errors) = WINDOWS_1252.encode(text);
        if had_errors {
            return Err(ImportError::Other(anyhow::anyhow!(
                "文本包含 cp1252 无法表示的字符"
            )));
        }
        Ok(bytes.into_owned())
    }
}

/// 逐前缀二分定位首个无法解码的字节偏移
fn first_undecodable_offset(encoding: &'static Encoding, bytes: &[u8]) -> usize {
    for end in 1..=bytes.len() {
        if encoding
            .decode_without_bom_handling_and_without_replacement(&bytes[..end])
            .is_none()
        {
            return end - 1;
        }
    }
    bytes.len().saturating_sub(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_plain_ascii() {
        let decoder = ByteDecoder;
        let text = decoder.decode(b"doc_no;qty\r\nRE-1;3", DEFAULT_ENCODING).unwrap();
        assert_eq!(text, "doc_no;qty\r\nRE-1;3");
    }

    #[test]
    fn test_decode_german_umlauts_and_euro() {
        let decoder = ByteDecoder;
        // cp1252: 0xE4 = ä, 0xDF = ß, 0x80 = €
        let bytes = [0x4D, 0xE4, 0xDF, 0x20, 0x80];
        let text = decoder.decode(&bytes, DEFAULT_ENCODING).unwrap();
        assert_eq!(text, "Mäß €");
    }

    #[test]
    fn test_decode_unassigned_byte_fails_with_offset() {
        let decoder = ByteDecoder;
        let bytes = [0x41, 0x42, 0x81, 0x43];
        let err = decoder.decode(&bytes, DEFAULT_ENCODING).unwrap_err();
        match err {
            ImportError::DecodeError { offset, byte, .. } => {
                assert_eq!(offset, 2);
                assert_eq!(byte, 0x81);
            }
            other => panic!("Expected DecodeError, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_unknown_label() {
        let decoder = ByteDecoder;
        let err = decoder.decode(b"abc", "ebcdic-037").unwrap_err();
        assert!(matches!(err, ImportError::UnknownEncoding(_)));
    }

    #[test]
    fn test_roundtrip_all_mapped_bytes() {
        // 解码完整性: 除 5 个未定义字节外，decode ∘ encode 还原原始字节
        let decoder = ByteDecoder;
        let bytes: Vec<u8> = (0u8..=255)
            .filter(|b| !CP1252_UNASSIGNED.contains(b))
            .collect();
        let text = decoder.decode(&bytes, DEFAULT_ENCODING).unwrap();
        let back = decoder.encode_cp1252(&text).unwrap();
        assert_eq!(back, bytes);
    }

    #[test]
    fn test_windows_1252_label_alias() {
        let decoder = ByteDecoder;
        let text = decoder.decode(&[0xDC], "windows-1252").unwrap();
        assert_eq!(text, "Ü");
    }
}
