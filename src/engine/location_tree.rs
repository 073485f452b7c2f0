// ==========================================
// 物资供应链报表系统 - 位置树索引
// ==========================================
// 职责: 由位置/站点平铺记录构建显式父子索引
// 红线: 不访问数据库；每次查询重新构建，不做缓存
// ==========================================

use crate::domain::location::{Location, LocationType, SupplyPoint};
use std::collections::{HashMap, HashSet};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LocationTreeError {
    #[error("位置 {location} 的上级 {parent} 不存在")]
    MissingParent { location: String, parent: String },

    #[error("位置树存在环路，涉及位置 {location}")]
    Cycle { location: String },

    #[error("站点 {supply_point} 所属位置 {location} 不存在")]
    MissingLocation {
        supply_point: String,
        location: String,
    },
}

/// 位置树索引
#[derive(Debug, Clone, Default)]
pub struct LocationIndex {
    locations: HashMap<String, Location>,
    /// 子位置（按类型展示顺序、名称排序）
    children: HashMap<String, Vec<String>>,
    roots: Vec<String>,
    supply_points: HashMap<String, SupplyPoint>,
    /// 位置直属站点（按名称排序）
    supply_points_by_location: HashMap<String, Vec<String>>,
}

impl LocationIndex {
    /// 构建索引；上级缺失、环路、站点位置缺失均视为数据错误
    pub fn build(
        locations: Vec<Location>,
        types: &[LocationType],
        supply_points: Vec<SupplyPoint>,
    ) -> Result<Self, LocationTreeError> {
        let type_order: HashMap<&str, Option<i32>> = types
            .iter()
            .map(|t| (t.code.as_str(), t.display_order))
            .collect();

        let locations: HashMap<String, Location> = locations
            .into_iter()
            .map(|l| (l.code.clone(), l))
            .collect();

        let mut children: HashMap<String, Vec<String>> = HashMap::new();
        let mut roots = Vec::new();
        for loc in locations.values() {
            match &loc.parent_code {
                Some(parent) => {
                    if !locations.contains_key(parent) {
                        return Err(LocationTreeError::MissingParent {
                            location: loc.code.clone(),
                            parent: parent.clone(),
                        });
                    }
                    children.entry(parent.clone()).or_default().push(loc.code.clone());
                }
                None => roots.push(loc.code.clone()),
            }
        }

        // 排序键: display_order（空值最后）→ 名称 → 编码
        let sort_key = |code: &String| {
            let loc = &locations[code];
            let order = type_order
                .get(loc.type_code.as_str())
                .copied()
                .flatten()
                .unwrap_or(i32::MAX);
            (order, loc.name.clone(), loc.code.clone())
        };
        for list in children.values_mut() {
            list.sort_by_key(sort_key);
        }
        roots.sort_by_key(sort_key);

        // 从根可达的节点数不足说明存在环路
        let mut reachable = HashSet::new();
        let mut stack: Vec<&String> = roots.iter().collect();
        while let Some(code) = stack.pop() {
            if reachable.insert(code.as_str()) {
                if let Some(kids) = children.get(code) {
                    stack.extend(kids.iter());
                }
            }
        }
        if reachable.len() != locations.len() {
            let mut stuck: Vec<&String> = locations
                .keys()
                .filter(|c| !reachable.contains(c.as_str()))
                .collect();
            stuck.sort();
            return Err(LocationTreeError::Cycle {
                location: stuck.first().map(|c| c.to_string()).unwrap_or_default(),
            });
        }

        let mut supply_points_by_location: HashMap<String, Vec<String>> = HashMap::new();
        for sp in &supply_points {
            if !locations.contains_key(&sp.location_code) {
                return Err(LocationTreeError::MissingLocation {
                    supply_point: sp.code.clone(),
                    location: sp.location_code.clone(),
                });
            }
            supply_points_by_location
                .entry(sp.location_code.clone())
                .or_default()
                .push(sp.code.clone());
        }
        let supply_points: HashMap<String, SupplyPoint> = supply_points
            .into_iter()
            .map(|sp| (sp.code.clone(), sp))
            .collect();
        for list in supply_points_by_location.values_mut() {
            list.sort_by(|a, b| {
                (&supply_points[a].name, a).cmp(&(&supply_points[b].name, b))
            });
        }

        tracing::debug!(
            locations = locations.len(),
            supply_points = supply_points.len(),
            "位置树索引构建完成"
        );

        Ok(Self {
            locations,
            children,
            roots,
            supply_points,
            supply_points_by_location,
        })
    }

    pub fn location(&self, code: &str) -> Option<&Location> {
        self.locations.get(code)
    }

    pub fn supply_point(&self, code: &str) -> Option<&SupplyPoint> {
        self.supply_points.get(code)
    }

    pub fn roots(&self) -> Vec<&Location> {
        self.roots.iter().filter_map(|c| self.locations.get(c)).collect()
    }

    /// 直接子位置（按类型展示顺序、名称排序）
    pub fn children(&self, code: &str) -> Vec<&Location> {
        self.children
            .get(code)
            .map(|kids| kids.iter().filter_map(|c| self.locations.get(c)).collect())
            .unwrap_or_default()
    }

    /// 自身及全部后代（先序）；未知编码返回空
    pub fn descendants_plus_self(&self, code: &str) -> Vec<&Location> {
        let mut out = Vec::new();
        let Some(root) = self.locations.get(code) else {
            return out;
        };
        let mut stack = vec![root];
        while let Some(loc) = stack.pop() {
            out.push(loc);
            // 逆序压栈以保持先序中的兄弟顺序
            for child in self.children(&loc.code).into_iter().rev() {
                stack.push(child);
            }
        }
        out
    }

    /// 祖先链（直接上级在前，根在最后）
    pub fn ancestors(&self, code: &str) -> Vec<&Location> {
        let mut out = Vec::new();
        let mut current = self.locations.get(code).and_then(|l| l.parent_code.as_ref());
        while let Some(parent_code) = current {
            match self.locations.get(parent_code) {
                Some(parent) => {
                    out.push(parent);
                    current = parent.parent_code.as_ref();
                }
                None => break,
            }
        }
        out
    }

    /// 位置直属站点
    pub fn supply_points_at(&self, code: &str, active_only: bool) -> Vec<&SupplyPoint> {
        self.supply_points_by_location
            .get(code)
            .map(|codes| {
                codes
                    .iter()
                    .filter_map(|c| self.supply_points.get(c))
                    .filter(|sp| !active_only || sp.active)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// 位置子树（含自身）下的全部站点
    pub fn supply_points_under(&self, code: &str, active_only: bool) -> Vec<&SupplyPoint> {
        self.descendants_plus_self(code)
            .into_iter()
            .flat_map(|loc| self.supply_points_at(&loc.code, active_only))
            .collect()
    }

    /// 子树内全部启用站点
    pub fn all_child_facilities(&self, code: &str) -> Vec<&SupplyPoint> {
        self.supply_points_under(code, true)
    }

    /// 站点所在位置的上级名称
    pub fn parent_name(&self, supply_point_code: &str) -> Option<&str> {
        let sp = self.supply_points.get(supply_point_code)?;
        let loc = self.locations.get(&sp.location_code)?;
        let parent = self.locations.get(loc.parent_code.as_ref()?)?;
        Some(parent.name.as_str())
    }

    /// 站点所在位置的上上级名称
    pub fn grandparent_name(&self, supply_point_code: &str) -> Option<&str> {
        let sp = self.supply_points.get(supply_point_code)?;
        let loc = self.locations.get(&sp.location_code)?;
        let parent = self.locations.get(loc.parent_code.as_ref()?)?;
        let grandparent = self.locations.get(parent.parent_code.as_ref()?)?;
        Some(grandparent.name.as_str())
    }

    /// 站点是否位于某位置的子树内（含自身）
    pub fn is_within(&self, supply_point_code: &str, location_code: &str) -> bool {
        let Some(sp) = self.supply_points.get(supply_point_code) else {
            return false;
        };
        sp.location_code == location_code
            || self
                .ancestors(&sp.location_code)
                .iter()
                .any(|l| l.code == location_code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn types() -> Vec<LocationType> {
        vec![
            LocationType { code: "country".into(), name: "Country".into(), display_order: Some(1) },
            LocationType { code: "region".into(), name: "Region".into(), display_order: Some(2) },
            LocationType { code: "district".into(), name: "District".into(), display_order: Some(3) },
            LocationType { code: "facility".into(), name: "Facility".into(), display_order: None },
        ]
    }

    fn sample() -> LocationIndex {
        let locations = vec![
            Location::new("MW", "Malawi", "country", None),
            Location::new("S", "South", "region", Some("MW")),
            Location::new("N", "North", "region", Some("MW")),
            Location::new("BL", "Blantyre", "district", Some("S")),
            Location::new("ZA", "Zomba", "district", Some("S")),
            Location::new("BL-HC", "Blantyre HC", "facility", Some("BL")),
        ];
        let mut inactive = SupplyPoint::new("SP3", "Closed", "ZA");
        inactive.active = false;
        let sps = vec![
            SupplyPoint::new("SP1", "Ndirande", "BL-HC"),
            SupplyPoint::new("SP2", "Chilomoni", "BL-HC"),
            inactive,
        ];
        LocationIndex::build(locations, &types(), sps).unwrap()
    }

    #[test]
    fn test_children_sorted_by_name() {
        let idx = sample();
        let names: Vec<&str> = idx.children("MW").iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, vec!["North", "South"]);
    }

    #[test]
    fn test_descendants_preorder() {
        let idx = sample();
        let codes: Vec<&str> = idx
            .descendants_plus_self("S")
            .iter()
            .map(|l| l.code.as_str())
            .collect();
        assert_eq!(codes, vec!["S", "BL", "BL-HC", "ZA"]);
        assert!(idx.descendants_plus_self("UNKNOWN").is_empty());
    }

    #[test]
    fn test_supply_points_under_and_active_filter() {
        let idx = sample();
        assert_eq!(idx.supply_points_under("S", false).len(), 3);
        let active: Vec<&str> = idx
            .all_child_facilities("MW")
            .iter()
            .map(|sp| sp.code.as_str())
            .collect();
        assert_eq!(active, vec!["SP2", "SP1"]);
    }

    #[test]
    fn test_parent_and_grandparent_names() {
        let idx = sample();
        assert_eq!(idx.parent_name("SP1"), Some("Blantyre"));
        assert_eq!(idx.grandparent_name("SP1"), Some("South"));
        assert_eq!(idx.grandparent_name("SP3"), Some("Malawi"));
        assert!(idx.is_within("SP1", "S"));
        assert!(!idx.is_within("SP1", "N"));
    }

    #[test]
    fn test_missing_parent_rejected() {
        let err = LocationIndex::build(
            vec![Location::new("BL", "Blantyre", "district", Some("S"))],
            &types(),
            vec![],
        )
        .unwrap_err();
        assert_eq!(
            err,
            LocationTreeError::MissingParent { location: "BL".into(), parent: "S".into() }
        );
    }

    #[test]
    fn test_cycle_rejected() {
        let err = LocationIndex::build(
            vec![
                Location::new("A", "A", "region", Some("B")),
                Location::new("B", "B", "region", Some("A")),
            ],
            &types(),
            vec![],
        )
        .unwrap_err();
        assert_eq!(err, LocationTreeError::Cycle { location: "A".into() });
    }
}
