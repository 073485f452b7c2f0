// ==========================================
// 集成测试公共模块
// ==========================================

pub mod test_data_builder;
