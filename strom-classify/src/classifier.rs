//! ## strom-classify::classifier
//! **Class-of-service and rule tables, and class selection**
//!
//! Fixed-size tables indexed by id. Each entry sits behind its own lock so
//! changing several fields of one class (queue and pool together) is never
//! observed half done, while lookups on other entries proceed in parallel.
//!
//! ### Selection order:
//! 1. A frame that failed parsing goes to the error class
//! 2. Rules attached to the interface, in attach order, following chained
//!    rules through each matching class
//! 3. The DSCP and VLAN priority maps, DSCP first when the interface prefers L3
//! 4. The interface's default class

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, error};

use strom_config::ClassifierConfig;
use strom_core::alloc::PoolId;
use strom_core::queue::QueueId;
use strom_protocols::ParsedPacket;

use crate::cos::{CosEntry, CosId, CosInfo, CosParams, DropPolicy};
use crate::error::{ClassifyError, ClassifyResult};
use crate::interface::{InterfaceRules, PktioClassifier};
use crate::limits::*;
use crate::rule::{PmrId, PmrRef, PmrSetId, Rule, RuleStats};
use crate::term::{PmrMatch, TermValue};

type Table<T> = Box<[RwLock<Option<T>>]>;

fn table<T>(entries: usize) -> Table<T> {
    (0..entries).map(|_| RwLock::new(None)).collect()
}

/// Claims the first free entry.
fn table_insert<T>(table: &Table<T>, value: T) -> Option<usize> {
    let mut value = Some(value);
    for (index, slot) in table.iter().enumerate() {
        let mut slot = slot.write();
        if slot.is_none() {
            *slot = value.take();
            return Some(index);
        }
    }
    None
}

pub struct Classifier {
    cos: Table<CosEntry>,
    pmrs: Table<Arc<Rule>>,
    pmr_sets: Table<Arc<Rule>>,
    /// Rules created so far, across both tables.
    generation: AtomicU64,
    config: ClassifierConfig,
}

impl Classifier {
    pub fn new(config: &ClassifierConfig) -> Self {
        Self {
            cos: table(config.cos_entries.clamp(1, COS_MAX_ENTRY)),
            pmrs: table(config.pmr_entries.clamp(1, PMR_MAX_ENTRY)),
            pmr_sets: table(config.pmr_set_entries.clamp(1, PMR_SET_MAX_ENTRY)),
            generation: AtomicU64::new(0),
            config: config.clone(),
        }
    }

    /// Fresh interface settings with the configured defaults.
    pub fn pktio_classifier(&self) -> PktioClassifier {
        PktioClassifier::from_config(&self.config)
    }

    // ---- classes of service ----

    pub fn cos_create(&self, name: &str, params: &CosParams) -> ClassifyResult<CosId> {
        if name.is_empty() || name.len() > COS_NAME_LEN {
            return Err(ClassifyError::InvalidParams(format!(
                "cos name must be 1 to {COS_NAME_LEN} bytes"
            )));
        }
        let index = table_insert(&self.cos, CosEntry::new(name, params)).ok_or(
            ClassifyError::TableFull {
                table: "cos",
                max: self.cos.len(),
            },
        )?;
        let id = CosId(index as u32);
        debug!(cos = %id, name, "class of service created");
        Ok(id)
    }

    pub fn cos_destroy(&self, id: CosId) -> ClassifyResult<()> {
        let slot = self.cos.get(id.index()).ok_or(ClassifyError::CosNotFound(id))?;
        let entry = slot.write().take().ok_or(ClassifyError::CosNotFound(id))?;
        debug!(cos = %id, name = %entry.name, "class of service destroyed");
        Ok(())
    }

    pub fn cos_lookup(&self, name: &str) -> Option<CosId> {
        self.cos.iter().enumerate().find_map(|(index, slot)| {
            slot.read()
                .as_ref()
                .filter(|entry| entry.name == name)
                .map(|_| CosId(index as u32))
        })
    }

    pub fn cos_info(&self, id: CosId) -> ClassifyResult<CosInfo> {
        self.with_cos(id, |entry| entry.info(id))
    }

    /// `None` turns the class into a sink.
    pub fn cos_queue_set(&self, id: CosId, queue: Option<QueueId>) -> ClassifyResult<()> {
        self.with_cos_mut(id, |entry| entry.queue = queue)
    }

    pub fn cos_queue(&self, id: CosId) -> ClassifyResult<Option<QueueId>> {
        self.with_cos(id, |entry| entry.queue)
    }

    /// `None` turns the class into a sink.
    pub fn cos_pool_set(&self, id: CosId, pool: Option<PoolId>) -> ClassifyResult<()> {
        self.with_cos_mut(id, |entry| entry.pool = pool)
    }

    pub fn cos_pool(&self, id: CosId) -> ClassifyResult<Option<PoolId>> {
        self.with_cos(id, |entry| entry.pool)
    }

    pub fn cos_drop_set(&self, id: CosId, policy: DropPolicy) -> ClassifyResult<()> {
        self.with_cos_mut(id, |entry| entry.drop_policy = policy)
    }

    pub fn cos_drop(&self, id: CosId) -> ClassifyResult<DropPolicy> {
        self.with_cos(id, |entry| entry.drop_policy)
    }

    pub fn cos_group_set(&self, id: CosId, group: u32) -> ClassifyResult<()> {
        self.with_cos_mut(id, |entry| entry.group = group)
    }

    pub fn cos_group(&self, id: CosId) -> ClassifyResult<u32> {
        self.with_cos(id, |entry| entry.group)
    }

    /// Headroom the consumers of this class expect. Stored for them to read
    /// through [`Classifier::cos_info`]; delivery does not move packet data.
    pub fn cos_headroom_set(&self, id: CosId, headroom: u32) -> ClassifyResult<()> {
        self.with_cos_mut(id, |entry| entry.headroom = headroom)
    }

    pub fn cos_headroom(&self, id: CosId) -> ClassifyResult<u32> {
        self.with_cos(id, |entry| entry.headroom)
    }

    /// Chains `rule` behind `src`: once `src` is selected, a packet that also
    /// matches `rule` moves on to `dst`.
    pub fn cos_pmr_cos(&self, rule: PmrRef, src: CosId, dst: CosId) -> ClassifyResult<()> {
        self.rule_checked(rule)?;
        self.cos_checked(dst)?;
        self.with_cos_mut(src, |entry| entry.link = Some((rule, dst)))
    }

    /// Number of free class entries.
    pub fn cos_available(&self) -> usize {
        self.cos.iter().filter(|slot| slot.read().is_none()).count()
    }

    pub(crate) fn with_cos<R>(&self, id: CosId, op: impl FnOnce(&CosEntry) -> R) -> ClassifyResult<R> {
        let slot = self.cos.get(id.index()).ok_or(ClassifyError::CosNotFound(id))?;
        let guard = slot.read();
        guard.as_ref().map(op).ok_or(ClassifyError::CosNotFound(id))
    }

    fn with_cos_mut<R>(&self, id: CosId, op: impl FnOnce(&mut CosEntry) -> R) -> ClassifyResult<R> {
        let slot = self.cos.get(id.index()).ok_or(ClassifyError::CosNotFound(id))?;
        let mut guard = slot.write();
        guard.as_mut().map(op).ok_or(ClassifyError::CosNotFound(id))
    }

    fn cos_checked(&self, id: CosId) -> ClassifyResult<CosId> {
        self.with_cos(id, |_| id)
    }

    fn cos_is_valid(&self, id: CosId) -> bool {
        self.cos
            .get(id.index())
            .is_some_and(|slot| slot.read().is_some())
    }

    // ---- rules ----

    pub fn pmr_create(&self, term: &PmrMatch) -> ClassifyResult<PmrId> {
        let rule = Rule::new(vec![TermValue::from_match(term)?], self.next_generation());
        let index = table_insert(&self.pmrs, Arc::new(rule)).ok_or(ClassifyError::TableFull {
            table: "pmr",
            max: self.pmrs.len(),
        })?;
        debug!(pmr = index, term = %term.term, "rule created");
        Ok(PmrId(index as u32))
    }

    pub fn pmr_destroy(&self, id: PmrId) -> ClassifyResult<()> {
        Self::rule_remove(&self.pmrs, id.into(), id.0)
    }

    /// Creates a rule matching only when every term matches.
    pub fn pmr_set_create(&self, terms: &[PmrMatch]) -> ClassifyResult<PmrSetId> {
        if terms.is_empty() || terms.len() > PMR_TERM_MAX {
            return Err(ClassifyError::TooManyTerms {
                count: terms.len(),
                max: PMR_TERM_MAX,
            });
        }
        let values = terms
            .iter()
            .map(TermValue::from_match)
            .collect::<ClassifyResult<Vec<_>>>()?;
        let rule = Rule::new(values, self.next_generation());
        let index = table_insert(&self.pmr_sets, Arc::new(rule)).ok_or(
            ClassifyError::TableFull {
                table: "pmr set",
                max: self.pmr_sets.len(),
            },
        )?;
        debug!(pmr_set = index, terms = terms.len(), "rule set created");
        Ok(PmrSetId(index as u32))
    }

    fn next_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::Relaxed)
    }

    pub fn pmr_set_destroy(&self, id: PmrSetId) -> ClassifyResult<()> {
        Self::rule_remove(&self.pmr_sets, id.into(), id.0)
    }

    fn rule_remove(table: &Table<Arc<Rule>>, rule: PmrRef, index: u32) -> ClassifyResult<()> {
        let slot = table
            .get(index as usize)
            .ok_or(ClassifyError::RuleNotFound(rule))?;
        slot.write().take().ok_or(ClassifyError::RuleNotFound(rule))?;
        debug!(%rule, "rule destroyed");
        Ok(())
    }

    /// Free single-rule entries.
    pub fn pmr_available(&self) -> usize {
        self.pmrs.iter().filter(|slot| slot.read().is_none()).count()
    }

    pub fn pmr_hits(&self, rule: PmrRef) -> ClassifyResult<u64> {
        Ok(self.rule_checked(rule)?.hits())
    }

    /// Hit counts of every live rule.
    pub fn rule_stats(&self) -> Vec<RuleStats> {
        let singles = self.pmrs.iter().enumerate().filter_map(|(index, slot)| {
            slot.read().as_ref().map(|rule| RuleStats {
                rule: PmrRef::Single(PmrId(index as u32)),
                generation: rule.generation(),
                terms: rule.term_count(),
                hits: rule.hits(),
            })
        });
        let sets = self.pmr_sets.iter().enumerate().filter_map(|(index, slot)| {
            slot.read().as_ref().map(|rule| RuleStats {
                rule: PmrRef::Set(PmrSetId(index as u32)),
                generation: rule.generation(),
                terms: rule.term_count(),
                hits: rule.hits(),
            })
        });
        singles.chain(sets).collect()
    }

    fn rule(&self, rule: PmrRef) -> Option<Arc<Rule>> {
        let (table, index) = match rule {
            PmrRef::Single(id) => (&self.pmrs, id.0),
            PmrRef::Set(id) => (&self.pmr_sets, id.0),
        };
        table.get(index as usize)?.read().clone()
    }

    fn rule_checked(&self, rule: PmrRef) -> ClassifyResult<Arc<Rule>> {
        self.rule(rule).ok_or(ClassifyError::RuleNotFound(rule))
    }

    /// Tests a rule against a parsed packet, counting a hit on match.
    /// A destroyed rule never matches.
    pub fn verify_pmr(&self, rule: PmrRef, pkt: &ParsedPacket<'_>) -> bool {
        self.rule(rule).is_some_and(|rule| rule.verify(pkt))
    }

    // ---- interfaces ----

    pub fn pktio_default_cos_set(&self, pktio: &PktioClassifier, cos: CosId) -> ClassifyResult<()> {
        pktio.state.write().default_cos = Some(self.cos_checked(cos)?);
        Ok(())
    }

    /// Class for frames that fail parsing. Overrides every other outcome.
    pub fn pktio_error_cos_set(&self, pktio: &PktioClassifier, cos: CosId) -> ClassifyResult<()> {
        pktio.state.write().error_cos = Some(self.cos_checked(cos)?);
        Ok(())
    }

    pub fn pktio_skip_set(&self, pktio: &PktioClassifier, offset: u32) {
        pktio.state.write().skip = offset;
    }

    /// Minimum headroom of received packets. The interface refuses to start
    /// when its receive pool reserves less; `skip` only adds to it.
    pub fn pktio_headroom_set(&self, pktio: &PktioClassifier, headroom: u32) {
        pktio.state.write().headroom = headroom;
    }

    /// Attaches a rule to an interface; packets matching it select `cos`.
    pub fn pktio_pmr_cos(&self, rule: PmrRef, pktio: &PktioClassifier, cos: CosId) -> ClassifyResult<()> {
        self.rule_checked(rule)?;
        self.cos_checked(cos)?;
        let mut state = pktio.state.write();
        if state.rules.len() >= PKTIO_MAX_PMR {
            return Err(ClassifyError::InterfaceRulesFull { max: PKTIO_MAX_PMR });
        }
        state.rules.push((rule, cos));
        Ok(())
    }

    /// Maps VLAN priority code points to classes.
    pub fn cos_with_l2_priority(&self, pktio: &PktioClassifier, map: &[(u8, CosId)]) -> ClassifyResult<()> {
        self.qos_check(map, L2_QOS_MAX, "VLAN priority")?;
        let mut state = pktio.state.write();
        for &(pcp, cos) in map {
            state.l2[usize::from(pcp)] = Some(cos);
        }
        Ok(())
    }

    /// Maps DSCP values to classes and sets which map is consulted first.
    pub fn cos_with_l3_qos(
        &self,
        pktio: &PktioClassifier,
        map: &[(u8, CosId)],
        l3_preference: bool,
    ) -> ClassifyResult<()> {
        self.qos_check(map, L3_QOS_MAX, "DSCP")?;
        let mut state = pktio.state.write();
        state.l3_precedence = l3_preference;
        for &(dscp, cos) in map {
            state.l3[usize::from(dscp)] = Some(cos);
        }
        Ok(())
    }

    fn qos_check(&self, map: &[(u8, CosId)], entries: usize, what: &str) -> ClassifyResult<()> {
        for &(value, cos) in map {
            if usize::from(value) >= entries {
                return Err(ClassifyError::InvalidParams(format!(
                    "{what} value {value} out of range (max {})",
                    entries - 1
                )));
            }
            self.cos_checked(cos)?;
        }
        Ok(())
    }

    /// Start-time check of an interface: every referenced class and rule must
    /// exist, and an interface without rules needs a default class.
    pub fn pktio_validate(&self, pktio: &PktioClassifier) -> ClassifyResult<()> {
        let state = pktio.state.read();
        if self.config.require_default_cos && state.rules.is_empty() && state.default_cos.is_none() {
            return Err(ClassifyError::NoDefaultCos);
        }
        for &(rule, cos) in &state.rules {
            self.rule_checked(rule)?;
            self.cos_checked(cos)?;
        }
        let fallbacks = [state.default_cos, state.error_cos];
        let qos = state.l2.iter().chain(state.l3.iter());
        for cos in fallbacks.iter().chain(qos).flatten() {
            self.cos_checked(*cos)?;
        }
        Ok(())
    }

    // ---- selection ----

    /// Picks the class for a parsed frame. `None` means drop.
    pub fn select_cos(&self, pktio: &PktioClassifier, pkt: &ParsedPacket<'_>) -> ClassifyResult<Option<CosId>> {
        let state = pktio.state.read();

        if pkt.is_error() {
            return Ok(state.error_cos.filter(|&cos| self.cos_is_valid(cos)));
        }

        for &(rule, cos) in &state.rules {
            if let Some(found) = self.match_pmr_cos(cos, rule, pkt)? {
                return Ok(Some(found));
            }
        }

        if let Some(cos) = self.match_qos_cos(&state, pkt) {
            return Ok(Some(cos));
        }

        Ok(state.default_cos.filter(|&cos| self.cos_is_valid(cos)))
    }

    /// Follows a rule chain starting at `start`, returning the deepest class
    /// whose rule matched.
    fn match_pmr_cos(&self, start: CosId, rule: PmrRef, pkt: &ParsedPacket<'_>) -> ClassifyResult<Option<CosId>> {
        if !self.cos_is_valid(start) || !self.verify_pmr(rule, pkt) {
            return Ok(None);
        }

        let mut current = start;
        let mut visited = 1u64 << start.index();
        for _ in 0..PMR_CHAIN_DEPTH_MAX {
            let link = self.with_cos(current, |entry| entry.link).ok().flatten();
            let Some((next_rule, next)) = link else {
                return Ok(Some(current));
            };
            if !self.cos_is_valid(next) {
                return Ok(Some(current));
            }
            if visited & (1u64 << next.index()) != 0 {
                if !self.rule(next_rule).is_some_and(|rule| rule.matches(pkt)) {
                    return Ok(Some(current));
                }
                error!(%start, cos = %next, "rule chain loops");
                return Err(ClassifyError::ChainCycle { start, cos: next });
            }
            if !self.verify_pmr(next_rule, pkt) {
                return Ok(Some(current));
            }
            visited |= 1u64 << next.index();
            current = next;
        }
        error!(%start, max = PMR_CHAIN_DEPTH_MAX, "rule chain too deep");
        Err(ClassifyError::ChainTooDeep {
            start,
            max: PMR_CHAIN_DEPTH_MAX,
        })
    }

    fn match_qos_cos(&self, state: &InterfaceRules, pkt: &ParsedPacket<'_>) -> Option<CosId> {
        let l2 = || {
            pkt.vlan_priority()
                .and_then(|pcp| state.l2[usize::from(pcp)])
                .filter(|&cos| self.cos_is_valid(cos))
        };
        let l3 = || {
            pkt.dscp()
                .and_then(|dscp| state.l3[usize::from(dscp)])
                .filter(|&cos| self.cos_is_valid(cos))
        };
        if state.l3_precedence {
            l3().or_else(l2)
        } else {
            l2().or_else(l3)
        }
    }
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new(&ClassifierConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::term::PmrTerm;
    use std::net::Ipv4Addr;
    use strom_core::ErrorKind;
    use strom_protocols::{FrameBuilder, PacketParser};
    use tracing_test::traced_test;

    fn sink(classifier: &Classifier, name: &str) -> CosId {
        classifier.cos_create(name, &CosParams::default()).unwrap()
    }

    fn tcp_frame(dport: u16) -> Vec<u8> {
        FrameBuilder::new()
            .ipv4(Ipv4Addr::new(10, 0, 0, 1), Ipv4Addr::new(10, 0, 0, 2))
            .tcp(40000, dport)
            .build()
            .to_vec()
    }

    #[test]
    fn cos_table_fills_and_recycles() {
        let classifier = Classifier::new(&ClassifierConfig {
            cos_entries: 2,
            ..ClassifierConfig::default()
        });
        let a = sink(&classifier, "a");
        let _b = sink(&classifier, "b");
        let err = classifier.cos_create("c", &CosParams::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ResourceExhausted);

        classifier.cos_destroy(a).unwrap();
        assert_eq!(classifier.cos_lookup("a"), None);
        assert_eq!(classifier.cos_available(), 1);
        assert_eq!(sink(&classifier, "c"), a);
        assert!(classifier.cos_destroy(CosId(9)).is_err());
    }

    #[test]
    fn cos_attributes_round_trip() {
        let classifier = Classifier::default();
        let cos = sink(&classifier, "voice");
        classifier.cos_queue_set(cos, Some(QueueId(3))).unwrap();
        classifier.cos_pool_set(cos, Some(PoolId(1))).unwrap();
        classifier.cos_drop_set(cos, DropPolicy::Never).unwrap();
        classifier.cos_group_set(cos, 2).unwrap();
        classifier.cos_headroom_set(cos, 64).unwrap();

        let info = classifier.cos_info(cos).unwrap();
        assert_eq!(info.name, "voice");
        assert_eq!(info.queue, Some(QueueId(3)));
        assert_eq!(classifier.cos_pool(cos), Ok(Some(PoolId(1))));
        assert_eq!(classifier.cos_drop(cos), Ok(DropPolicy::Never));
        assert_eq!(classifier.cos_group(cos), Ok(2));
        assert_eq!(classifier.cos_headroom(cos), Ok(64));
        assert!(classifier.cos_create("", &CosParams::default()).is_err());
    }

    #[test]
    fn port_rule_counts_hits() {
        let classifier = Classifier::default();
        let web = sink(&classifier, "web");
        let pmr = classifier
            .pmr_create(&PmrMatch::new(PmrTerm::TcpDport, 80, 0xFFFF))
            .unwrap();
        let pktio = PktioClassifier::new();
        classifier.pktio_pmr_cos(pmr.into(), &pktio, web).unwrap();

        let parser = PacketParser::new();
        let http = tcp_frame(80);
        let alt = tcp_frame(8080);
        assert_eq!(classifier.select_cos(&pktio, &parser.parse(&http)), Ok(Some(web)));
        assert_eq!(classifier.pmr_hits(pmr.into()), Ok(1));
        assert_eq!(classifier.select_cos(&pktio, &parser.parse(&alt)), Ok(None));
        assert_eq!(classifier.pmr_hits(pmr.into()), Ok(1));
    }

    #[test]
    fn chained_rules_pick_the_deepest_match() {
        let classifier = Classifier::default();
        let tcp = sink(&classifier, "tcp");
        let web = sink(&classifier, "web");
        let is_tcp = classifier
            .pmr_create(&PmrMatch::new(PmrTerm::IpProto, 6, 0xFF))
            .unwrap();
        let is_web = classifier
            .pmr_create(&PmrMatch::new(PmrTerm::TcpDport, 80, 0xFFFF))
            .unwrap();
        let pktio = PktioClassifier::new();
        classifier.pktio_pmr_cos(is_tcp.into(), &pktio, tcp).unwrap();
        classifier.cos_pmr_cos(is_web.into(), tcp, web).unwrap();

        let parser = PacketParser::new();
        assert_eq!(classifier.select_cos(&pktio, &parser.parse(&tcp_frame(80))), Ok(Some(web)));
        assert_eq!(classifier.select_cos(&pktio, &parser.parse(&tcp_frame(22))), Ok(Some(tcp)));
        assert_eq!(classifier.cos_info(tcp).unwrap().link, Some((is_web.into(), web)));
    }

    #[traced_test]
    #[test]
    fn chain_cycle_is_a_configuration_error() {
        let classifier = Classifier::default();
        let a = sink(&classifier, "a");
        let b = sink(&classifier, "b");
        let any = classifier
            .pmr_create(&PmrMatch::new(PmrTerm::IpProto, 0, 0))
            .unwrap();
        let pktio = PktioClassifier::new();
        classifier.pktio_pmr_cos(any.into(), &pktio, a).unwrap();
        classifier.cos_pmr_cos(any.into(), a, b).unwrap();
        classifier.cos_pmr_cos(any.into(), b, a).unwrap();

        let frame = tcp_frame(80);
        let err = classifier
            .select_cos(&pktio, &PacketParser::new().parse(&frame))
            .unwrap_err();
        assert_eq!(err, ClassifyError::ChainCycle { start: a, cos: a });
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert!(logs_contain("rule chain loops"));
        // interface attachment and a -> b; the closing b -> a link is not a hit
        assert_eq!(classifier.pmr_hits(any.into()), Ok(2));
    }

    #[test]
    fn rule_sets_need_every_term() {
        let classifier = Classifier::default();
        let dns = sink(&classifier, "dns");
        let set = classifier
            .pmr_set_create(&[
                PmrMatch::new(PmrTerm::DipAddr, 0x0A00_0002, 0xFFFF_FFFF),
                PmrMatch::new(PmrTerm::TcpDport, 53, 0xFFFF),
            ])
            .unwrap();
        let pktio = PktioClassifier::new();
        classifier.pktio_pmr_cos(set.into(), &pktio, dns).unwrap();

        let parser = PacketParser::new();
        assert_eq!(classifier.select_cos(&pktio, &parser.parse(&tcp_frame(53))), Ok(Some(dns)));
        assert_eq!(classifier.select_cos(&pktio, &parser.parse(&tcp_frame(54))), Ok(None));

        let too_many = vec![PmrMatch::new(PmrTerm::Len, 0, 0); PMR_TERM_MAX + 1];
        assert!(matches!(
            classifier.pmr_set_create(&too_many),
            Err(ClassifyError::TooManyTerms { .. })
        ));
        assert_eq!(classifier.rule_stats().len(), 1);
    }

    #[test]
    fn destroyed_rules_stop_matching() {
        let classifier = Classifier::default();
        let cos = sink(&classifier, "c");
        let pmr = classifier
            .pmr_create(&PmrMatch::new(PmrTerm::TcpDport, 80, 0xFFFF))
            .unwrap();
        let before = classifier.pmr_available();
        let pktio = PktioClassifier::new();
        classifier.pktio_pmr_cos(pmr.into(), &pktio, cos).unwrap();
        classifier.pmr_destroy(pmr).unwrap();

        assert_eq!(classifier.pmr_available(), before + 1);
        let frame = tcp_frame(80);
        assert!(!classifier.verify_pmr(pmr.into(), &PacketParser::new().parse(&frame)));
        assert!(matches!(
            classifier.pktio_validate(&pktio),
            Err(ClassifyError::RuleNotFound(_))
        ));
    }

    #[test]
    fn interface_rule_limit() {
        let classifier = Classifier::default();
        let cos = sink(&classifier, "c");
        let pmr = classifier
            .pmr_create(&PmrMatch::new(PmrTerm::Len, 0, 0))
            .unwrap();
        let pktio = PktioClassifier::new();
        for _ in 0..PKTIO_MAX_PMR {
            classifier.pktio_pmr_cos(pmr.into(), &pktio, cos).unwrap();
        }
        let err = classifier.pktio_pmr_cos(pmr.into(), &pktio, cos).unwrap_err();
        assert_eq!(err, ClassifyError::InterfaceRulesFull { max: PKTIO_MAX_PMR });
        assert_eq!(pktio.rules().len(), PKTIO_MAX_PMR);
    }

    #[test]
    fn validation_requires_a_default() {
        let classifier = Classifier::default();
        let pktio = PktioClassifier::new();
        assert_eq!(classifier.pktio_validate(&pktio), Err(ClassifyError::NoDefaultCos));

        let cos = sink(&classifier, "default");
        classifier.pktio_default_cos_set(&pktio, cos).unwrap();
        assert_eq!(classifier.pktio_validate(&pktio), Ok(()));

        let relaxed = Classifier::new(&ClassifierConfig {
            require_default_cos: false,
            l3_precedence: true,
            ..ClassifierConfig::default()
        });
        let pktio = relaxed.pktio_classifier();
        assert!(pktio.l3_precedence());
        assert_eq!(relaxed.pktio_validate(&pktio), Ok(()));
    }

    #[test]
    fn qos_values_are_range_checked() {
        let classifier = Classifier::default();
        let cos = sink(&classifier, "c");
        let pktio = PktioClassifier::new();
        assert!(classifier.cos_with_l2_priority(&pktio, &[(8, cos)]).is_err());
        assert!(classifier.cos_with_l3_qos(&pktio, &[(64, cos)], true).is_err());
        assert!(classifier.cos_with_l3_qos(&pktio, &[(63, cos)], true).is_ok());
        assert!(pktio.l3_precedence());
    }
}
